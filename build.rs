use std::process::Command;
fn main() {
    // runs git describe --always --dirty
    if let Ok(output) = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
    {
        let git_hash = String::from_utf8_lossy(&output.stdout);
        let git_hash = git_hash.trim();
        let git_hash = if git_hash.is_empty() { "UNKNOWN" } else { git_hash };
        println!("cargo:rustc-env=GIT_HASH={git_hash}");
    } else {
        println!("cargo:rustc-env=GIT_HASH=UNKNOWN");
    }
}
