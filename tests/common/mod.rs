//! Shared fixtures: shell stand-ins for the scanner executable.
#![allow(dead_code)]

use hqs_daq::config::Settings;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Rows with one reading below the invalid-range floor.
pub const MIXED_ROWS: &str = "0,0,-25\n1,1,-5\n2,2,10\n";

/// Rows that are all below the invalid-range floor.
pub const FLOOR_ROWS: &str = "0,0,-25\n1,1,-32.768\n";

/// Behaves like the scanner: records `rows` to the `-o` path, then runs
/// until it reads `q` on stdin.
pub fn well_behaved_scanner(dir: &Path, rows: &str) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
out=""
for arg in "$@"; do
    case "$arg" in
        -o*) out="${{arg#-o}}" ;;
    esac
done
echo "scanner started $*"
if [ -n "$out" ]; then
    cat > "$out" <<'ROWS'
{rows}ROWS
fi
while read -r line; do
    case "$line" in
        q*) echo "Operation halted by user" >&2; exit 0 ;;
    esac
done
exit 0
"#
    );
    write_script(dir, "scanner.sh", &script)
}

/// Records `rows` to the `-o` path, then ignores the quit signal.
pub fn stubborn_scanner(dir: &Path, rows: &str) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
for arg in "$@"; do
    case "$arg" in
        -o*) cat > "${{arg#-o}}" <<'ROWS'
{rows}ROWS
        ;;
    esac
done
echo "recording"
exec sleep 30
"#
    );
    write_script(dir, "stubborn.sh", &script)
}

/// Lines each stream of [`chatty_scanner`] writes before it reads stdin.
pub const CHATTY_LINES: usize = 3000;

/// Writes well over a pipe buffer to both stdout and stderr before it
/// starts reading its quit signal.
pub fn chatty_scanner(dir: &Path) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
i=0
while [ $i -lt {CHATTY_LINES} ]; do
    echo "stdout line $i of the profile stream"
    echo "stderr line $i of the diagnostic stream" >&2
    i=$((i + 1))
done
while read -r line; do
    case "$line" in
        q*) exit 0 ;;
    esac
done
exit 0
"#
    );
    write_script(dir, "chatty.sh", &script)
}

/// Ignores the quit signal entirely.
pub fn hung_scanner(dir: &Path) -> PathBuf {
    write_script(dir, "hung.sh", "#!/bin/sh\necho waiting\nexec sleep 30\n")
}

/// Dies straight after launch.
pub fn crashing_scanner(dir: &Path) -> PathBuf {
    write_script(dir, "crash.sh", "#!/bin/sh\necho boom >&2\nexit 3\n")
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Settings that keep every output inside `dir`.
pub fn settings_in(dir: &Path, executable: PathBuf) -> Settings {
    let mut settings = Settings::default();
    settings.scanner.executable = executable;
    settings.scanner.config_file = dir.join("scanner.toml");
    settings.scanner.stop_timeout_ms = 5000;
    settings.storage.data_dir = dir.join("data");
    settings.storage.image_dir = dir.join("data/img");
    settings.storage.log_dir = dir.join("logs");
    settings
}

/// Gives a freshly spawned shell time to reach its read loop or exit.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}
