use std::env;
use std::fs;
use std::path::Path;

/// On Windows, vendors SDL2.dll next to the built binary so the emulator
/// runs without the user installing SDL2 separately. The `sdl2` crate's
/// "bundled" feature builds the static library from source on every
/// platform; this step only matters for dynamic linking on Windows.
fn main() {
    let target = env::var("TARGET").unwrap();
    if !target.contains("windows") {
        return;
    }

    let profile = env::var("PROFILE").unwrap();
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let sdl2_dll = if target.contains("x86_64") {
        "C:/vcpkg/installed/x64-windows/bin/SDL2.dll"
    } else {
        "C:/vcpkg/installed/x86-windows/bin/SDL2.dll"
    };

    if !Path::new(sdl2_dll).exists() {
        return;
    }

    let out_path = Path::new(&manifest_dir).join("target").join(&profile).join("SDL2.dll");
    let _ = fs::copy(sdl2_dll, out_path);
}
