fn main() {
    // Embed the application manifest when building with the MSVC Windows toolchain.
    // This enables PerMonitorV2 DPI awareness as declared in glasspane.manifest.
    #[cfg(all(target_os = "windows", target_env = "msvc"))]
    {
        println!("cargo:rerun-if-changed=glasspane.manifest");
        println!("cargo:rustc-link-arg=/MANIFEST:EMBED");
        println!("cargo:rustc-link-arg=/MANIFESTINPUT:glasspane.manifest");
        println!("cargo:rustc-link-arg=/MANIFESTUAC:level='asInvoker' uiAccess='false'");
    }
    // If someone builds with MinGW (gnu), we just warn (no embedding here).
    #[cfg(all(target_os = "windows", not(target_env = "msvc")))]
    {
        println!(
            "cargo:warning=Manifest embedding not configured for non-MSVC toolchain; glasspane.manifest may be ignored."
        );
    }
}
