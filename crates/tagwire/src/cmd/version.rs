use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("tagwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: tagwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", env!("TAGWIRE_BUILD_TARGET"));
    println!("profile: {}", env!("TAGWIRE_BUILD_PROFILE"));
    println!(
        "transports: unix, tcp{}",
        if cfg!(feature = "async") { ", ws" } else { "" }
    );
    println!("builtin tags: {}", tagwire::handlers::TAGS.join(", "));
    println!("schema validation: {}", cfg!(feature = "schema"));

    Ok(SUCCESS)
}
