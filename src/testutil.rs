//! Filesystem fixtures shared by unit tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Creates an empty per-test directory under the system temp dir.
pub(crate) fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rtiny-unit-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_script(path: &Path, body: &str, mode: u32) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

/// Directory of small shell CGI programs, written once per test binary.
///
/// Every script is written before any test can spawn one, so no program is ever
/// executed while a writable descriptor to it is still open somewhere.
pub(crate) fn cgi_scripts() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = scratch_dir("cgi-bin");
        let header = r"printf 'Content-Type: text/plain\r\n\r\n'";

        write_script(&dir.join("env.sh"), &format!("#!/bin/sh\n{header}\nenv\n"), 0o755);
        write_script(&dir.join("cat.sh"), &format!("#!/bin/sh\n{header}\ncat\n"), 0o755);
        write_script(
            &dir.join("early.sh"),
            &format!("#!/bin/sh\n{header}\nprintf bye\n"),
            0o755,
        );
        write_script(
            &dir.join("fail.sh"),
            &format!("#!/bin/sh\n{header}\nprintf partial\nexit 3\n"),
            0o755,
        );
        write_script(&dir.join("noexec.sh"), &format!("#!/bin/sh\n{header}\n"), 0o644);
        write_script(
            &dir.join("no-interpreter.sh"),
            "#!/nonexistent/rtiny-interpreter\n",
            0o755,
        );
        dir
    })
}
