fn main() {
    // libgit2 needs advapi32 on Windows for credential and registry lookups
    if std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() == "windows" {
        println!("cargo:rustc-link-lib=advapi32");
    }
}
