use std::env;
use std::process::Command;

// Guard against a common footgun: building x86_64 on an Apple Silicon
// host with Homebrew's arm64 OpenSSL under /opt/homebrew. git2 links
// OpenSSL, and that combination fails late with unresolved
// _OPENSSL_init_ssl instead of a useful message.
fn main() {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if target_os != "macos" || target_arch != "x86_64" {
        return;
    }

    let host_arch = match uname_arch() {
        Some(arch) => arch,
        None => return,
    };
    if host_arch != "arm64" && host_arch != "aarch64" {
        return;
    }

    let env_keys = [
        "OPENSSL_DIR",
        "OPENSSL_LIB_DIR",
        "OPENSSL_INCLUDE_DIR",
        "PKG_CONFIG_PATH",
        "LDFLAGS",
        "CPPFLAGS",
        "LIBRARY_PATH",
    ];
    for key in env_keys {
        println!("cargo:rerun-if-env-changed={}", key);
    }

    // An explicit x86_64 OpenSSL location means the cross-build is
    // intentional and wired correctly.
    for key in ["OPENSSL_DIR", "OPENSSL_LIB_DIR", "OPENSSL_INCLUDE_DIR"] {
        if let Ok(value) = env::var(key) {
            if value.contains("/usr/local") || value.contains("/opt/local") {
                return;
            }
        }
    }

    let bad_keys: Vec<&str> = env_keys
        .iter()
        .copied()
        .filter(|key| {
            env::var(key)
                .map(|value| value.contains("/opt/homebrew"))
                .unwrap_or(false)
        })
        .collect();
    let pkg_config_bad = pkg_config_uses_opt_homebrew();

    if bad_keys.is_empty() && !pkg_config_bad {
        return;
    }

    let mut message = String::from(
        "Building x86_64 on an arm64 macOS host with OpenSSL from /opt/homebrew.\n\
         This links arm64 OpenSSL and fails with unresolved _OPENSSL_init_ssl.\n\
         Fix:\n\
         \x20 - Use an arm64 toolchain: rustup default stable-aarch64-apple-darwin\n\
         \x20 - OR point OPENSSL_DIR/PKG_CONFIG_PATH/LDFLAGS/CPPFLAGS at x86_64 \
         OpenSSL under /usr/local.\n",
    );
    if !bad_keys.is_empty() {
        message.push_str("Found /opt/homebrew in: ");
        message.push_str(&bad_keys.join(", "));
        message.push('\n');
    }
    if pkg_config_bad {
        message.push_str("pkg-config reports /opt/homebrew OpenSSL.\n");
    }

    panic!("{}", message);
}

fn uname_arch() -> Option<String> {
    let output = Command::new("uname").arg("-m").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let arch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if arch.is_empty() {
        None
    } else {
        Some(arch)
    }
}

fn pkg_config_uses_opt_homebrew() -> bool {
    let output = match Command::new("pkg-config")
        .arg("--libs")
        .arg("openssl")
        .output()
    {
        Ok(output) => output,
        Err(_) => return false,
    };

    if !output.status.success() {
        return false;
    }

    String::from_utf8_lossy(&output.stdout).contains("/opt/homebrew")
}
