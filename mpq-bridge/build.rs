use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=STORMLIB_LIB_DIR");

    if env::var("CARGO_FEATURE_STORMLIB").is_ok() {
        if let Ok(dir) = env::var("STORMLIB_LIB_DIR") {
            println!("cargo:rustc-link-search=native={}", dir);
        }

        // The Windows build ships as StormLib.lib, everything else as libstorm.
        let lib = match env::var("CARGO_CFG_TARGET_OS").as_deref() {
            Ok("windows") => "StormLib",
            _ => "storm",
        };
        println!("cargo:rustc-link-lib={}", lib);
    }
}
