//! Purpose: Compile the MacroQuest C++ shim when building against a live host.
//! Role: Cargo build-script; configures `cc` inputs/includes, link libraries and rebuild triggers.
//! Invariants: Without the `host` feature nothing is compiled or linked, so the crate builds anywhere.
//! Invariants: With `host`, `MACROQUEST_DIR` must point at a built MacroQuest checkout.
//! Invariants: `MACROQUEST_BUILD_PROFILE` (default `Release`) selects the library directory.
use std::env;
use std::path::{Path, PathBuf};

const INCLUDE_DIRS: [&str; 6] = [
    "include",
    "src",
    "contrib",
    "contrib/imgui",
    "contrib/vcpkg/installed/x64-windows-static/include",
    "contrib/vcpkg/installed/x64-windows/include",
];

fn main() {
    println!("cargo:rerun-if-changed=c/mq_shim.cpp");
    println!("cargo:rerun-if-changed=c/mq_shim.h");
    println!("cargo:rerun-if-env-changed=MACROQUEST_DIR");
    println!("cargo:rerun-if-env-changed=MACROQUEST_BUILD_PROFILE");

    if env::var_os("CARGO_FEATURE_HOST").is_none() {
        return;
    }

    let target = env::var("TARGET").unwrap_or_default();
    if !target.contains("windows-msvc") {
        panic!(
            "the `host` feature links against MacroQuest, which only builds for windows-msvc \
             targets (got `{target}`).\n\
             Fix: build without `--features host`, or target x86_64-pc-windows-msvc."
        );
    }

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let mq_dir = match env::var_os("MACROQUEST_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => panic!(
            "MACROQUEST_DIR is not set.\n\
             Fix: point MACROQUEST_DIR at a MacroQuest checkout that has been built, then run \
             cargo build again."
        ),
    };
    let profile = env::var("MACROQUEST_BUILD_PROFILE").unwrap_or_else(|_| "Release".to_string());
    let arch = if target.starts_with("x86_64") { "x64" } else { "x86" };

    let mut build = cc::Build::new();
    build
        .cpp(true)
        .std("c++17")
        .include(manifest_dir.join("c"))
        .file(manifest_dir.join("c").join("mq_shim.cpp"))
        .define("NOMINMAX", None)
        .define("WIN32_LEAN_AND_MEAN", None)
        .flag_if_supported("/Zc:__cplusplus");
    for dir in INCLUDE_DIRS {
        build.include(mq_dir.join(dir));
    }
    build.compile("mqbridge_shim");

    for dir in lib_dirs(&mq_dir, &profile, arch) {
        println!("cargo:rustc-link-search=native={}", dir.display());
    }
    println!("cargo:rustc-link-lib=MQ2Main");
    println!("cargo:rustc-link-lib=eqlib");
}

fn lib_dirs(mq_dir: &Path, profile: &str, arch: &str) -> Vec<PathBuf> {
    vec![
        mq_dir.join("build").join("bin").join(profile),
        mq_dir.join("build").join("lib").join(arch).join(profile),
        mq_dir
            .join("contrib")
            .join("vcpkg")
            .join("installed")
            .join(format!("{arch}-windows-static"))
            .join("lib"),
        mq_dir
            .join("contrib")
            .join("vcpkg")
            .join("installed")
            .join(format!("{arch}-windows"))
            .join("lib"),
    ]
}
