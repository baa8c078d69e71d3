// Records what the binary was built for; `tagwire version --extended` prints it.
fn main() {
    for (cargo_var, exported) in [
        ("TARGET", "TAGWIRE_BUILD_TARGET"),
        ("PROFILE", "TAGWIRE_BUILD_PROFILE"),
    ] {
        println!("cargo:rerun-if-env-changed={cargo_var}");
        let value = std::env::var(cargo_var).unwrap_or_else(|_| "unknown".to_string());
        println!("cargo:rustc-env={exported}={value}");
    }
}
