//! `gsi`: host report.
//!
//! Values the platform will not give up are reported as empty strings or
//! zero rather than failing the request.

use tagwire_dispatch::{Response, Sequence};
use tracing::debug;

use crate::models::{GetSystemInfo, InfoCategory, SystemInfo};

pub fn get_system_info(sequence: Sequence, request: GetSystemInfo) -> Response {
    let mut info = SystemInfo::default();

    if request.wants(InfoCategory::Os) {
        let (name, version) = os_name_and_version();
        info.os_name = Some(name);
        info.os_version = Some(version);
    }
    if request.wants(InfoCategory::Cpu) {
        info.cpu_info = Some(cpu_info());
    }
    if request.wants(InfoCategory::Memory) {
        let (total, available) = memory();
        info.total_memory = Some(total);
        info.available_memory = Some(available);
    }
    if request.wants(InfoCategory::Disk) {
        let (total, available) = disk("/");
        info.total_disk = Some(total);
        info.available_disk = Some(available);
    }

    Response::success(sequence, &info)
}

#[cfg(unix)]
fn os_name_and_version() -> (String, String) {
    // SAFETY: `utsname` is plain old data; zeroed is a valid initial value.
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    // SAFETY: `uts` is a valid, writable `utsname`.
    let rc = unsafe { libc::uname(&mut uts) };
    if rc != 0 {
        debug!("uname failed");
        return (std::env::consts::OS.to_string(), String::new());
    }
    (c_chars(&uts.sysname), c_chars(&uts.release))
}

#[cfg(not(unix))]
fn os_name_and_version() -> (String, String) {
    (std::env::consts::OS.to_string(), String::new())
}

#[cfg(unix)]
fn c_chars(field: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn cpu_info() -> String {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let model = cpu_model().unwrap_or_else(|| std::env::consts::ARCH.to_string());
    format!("{model} ({cores} logical cores)")
}

#[cfg(target_os = "linux")]
fn cpu_model() -> Option<String> {
    let cpuinfo = std::fs::read_to_string("/proc/cpuinfo").ok()?;
    cpuinfo
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, model)| model.trim().to_string())
}

#[cfg(not(target_os = "linux"))]
fn cpu_model() -> Option<String> {
    None
}

/// `(total, available)` bytes of physical memory.
#[cfg(target_os = "linux")]
fn memory() -> (u64, u64) {
    match std::fs::read_to_string("/proc/meminfo") {
        Ok(meminfo) => parse_meminfo(&meminfo),
        Err(err) => {
            debug!(error = %err, "cannot read /proc/meminfo");
            (0, 0)
        }
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn memory() -> (u64, u64) {
    // SAFETY: sysconf has no memory-safety preconditions.
    let (pages, page_size) = unsafe {
        (
            libc::sysconf(libc::_SC_PHYS_PAGES),
            libc::sysconf(libc::_SC_PAGESIZE),
        )
    };
    if pages < 0 || page_size < 0 {
        return (0, 0);
    }
    (pages as u64 * page_size as u64, 0)
}

#[cfg(not(unix))]
fn memory() -> (u64, u64) {
    (0, 0)
}

#[cfg(any(target_os = "linux", test))]
fn parse_meminfo(meminfo: &str) -> (u64, u64) {
    let field = |name: &str| -> u64 {
        meminfo
            .lines()
            .find_map(|line| line.strip_prefix(name))
            .and_then(|rest| rest.trim_start_matches(':').split_whitespace().next())
            .and_then(|kib| kib.parse::<u64>().ok())
            .map(|kib| kib * 1024)
            .unwrap_or(0)
    };
    (field("MemTotal"), field("MemAvailable"))
}

/// `(total, available)` bytes on the filesystem holding `path`.
#[cfg(unix)]
fn disk(path: &str) -> (u64, u64) {
    let Ok(c_path) = std::ffi::CString::new(path) else {
        return (0, 0);
    };
    // SAFETY: `statvfs` is plain old data; zeroed is a valid initial value.
    let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: `c_path` is NUL-terminated and `stats` is valid and writable.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stats) };
    if rc != 0 {
        debug!(path, error = %std::io::Error::last_os_error(), "statvfs failed");
        return (0, 0);
    }
    let fragment = stats.f_frsize as u64;
    (
        stats.f_blocks as u64 * fragment,
        stats.f_bavail as u64 * fragment,
    )
}

#[cfg(not(unix))]
fn disk(_path: &str) -> (u64, u64) {
    (0, 0)
}
