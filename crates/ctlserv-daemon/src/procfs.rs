//! Read-only views into the process-listing pseudo-filesystem.
//!
//! `/proc` entries come and go between `readdir` and `open`; malformed
//! or vanished entries are skipped, never errors.

use std::fs;
use std::path::Path;

use nix::unistd::Pid;

/// Enumerate live processes whose parent is `parent`.
pub fn children_of(parent: Pid) -> Vec<Pid> {
    children_of_in(Path::new("/proc"), parent)
}

fn children_of_in(proc_root: &Path, parent: Pid) -> Vec<Pid> {
    let mut children = Vec::new();

    let Ok(entries) = fs::read_dir(proc_root) else {
        return children;
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        let Ok(stat) = fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };
        if let Some((pid, ppid)) = parse_stat_parent(&stat) {
            if ppid == parent.as_raw() {
                children.push(Pid::from_raw(pid));
            }
        }
    }

    children
}

/// Extract `(pid, ppid)` from a `/proc/<pid>/stat` line.
///
/// The comm field may itself contain spaces and parentheses, so the
/// fixed fields are located relative to the *last* closing paren.
pub(crate) fn parse_stat_parent(stat: &str) -> Option<(i32, i32)> {
    let open = stat.find('(')?;
    let close = stat.rfind(')')?;

    let pid: i32 = stat[..open].trim().parse().ok()?;

    let mut fields = stat[close + 1..].split_whitespace();
    let _state = fields.next()?;
    let ppid: i32 = fields.next()?.parse().ok()?;

    Some((pid, ppid))
}
