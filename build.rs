use std::process::Command;

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let out = String::from_utf8(output.stdout).ok()?;
    let out = out.trim();
    (!out.is_empty()).then(|| out.to_owned())
}

fn main() {
    let commit = std::env::var("EXPORTER_GIT_COMMIT")
        .ok()
        .or_else(|| command_output("git", &["rev-parse", "--short", "HEAD"]))
        .unwrap_or_else(|| "unknown".to_owned());
    let build_date = std::env::var("EXPORTER_BUILD_DATE")
        .ok()
        .or_else(|| command_output("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"]))
        .unwrap_or_else(|| "unknown".to_owned());
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_owned());
    let rustc_version =
        command_output(&rustc, &["--version"]).unwrap_or_else(|| "unknown".to_owned());

    println!("cargo:rustc-env=EXPORTER_GIT_COMMIT={commit}");
    println!("cargo:rustc-env=EXPORTER_BUILD_DATE={build_date}");
    println!("cargo:rustc-env=EXPORTER_RUSTC_VERSION={rustc_version}");
    println!("cargo:rerun-if-env-changed=EXPORTER_GIT_COMMIT");
    println!("cargo:rerun-if-env-changed=EXPORTER_BUILD_DATE");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
