use std::fs::Metadata;

/// Renders the ten character permission string used in summary lines,
/// e.g. `drwxr-xr-x` or `-rw-r--r--`.
pub fn mode_string(metadata: &Metadata) -> String {
    render(metadata.is_dir(), permission_bits(metadata))
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

/// Without POSIX modes all we know is whether the entry is read only.
#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    let dir_bits = if metadata.is_dir() { 0o111 } else { 0 };
    if metadata.permissions().readonly() {
        0o444 | dir_bits
    } else {
        0o666 | dir_bits
    }
}

fn render(is_dir: bool, mode: u32) -> String {
    let mut s = String::with_capacity(10);
    s.push(if is_dir { 'd' } else { '-' });
    for shift in [6, 3, 0] {
        let triple = (mode >> shift) & 0o7;
        s.push(if triple & 0o4 != 0 { 'r' } else { '-' });
        s.push(if triple & 0o2 != 0 { 'w' } else { '-' });
        s.push(if triple & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

/// Checks that a string has the shape [`mode_string`] produces.
pub fn is_mode_string(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && matches!(b[0], b'd' | b'-')
        && b[1..]
            .iter()
            .zip(b"rwxrwxrwx")
            .all(|(&c, &letter)| c == letter || c == b'-')
}

#[test]
fn test_render() {
    assert_eq!(render(true, 0o755), "drwxr-xr-x");
    assert_eq!(render(false, 0o644), "-rw-r--r--");
    assert_eq!(render(false, 0o100640), "-rw-r-----");
    assert_eq!(render(false, 0), "----------");
    assert!(is_mode_string("drwxr-xr-x"));
    assert!(!is_mode_string("drwxr-xr-"));
    assert!(!is_mode_string("xrwxr-xr-x"));
    assert!(!is_mode_string("-wrxr-xr-x"));
}

#[cfg(unix)]
#[test]
fn test_mode_string_of_real_entries() -> Result<(), std::io::Error> {
    use std::os::unix::fs::PermissionsExt;
    let tempdir = tempfile::tempdir()?;
    let file = tempdir.path().join("script.sh");
    std::fs::write(&file, b"#!/bin/sh\n")?;
    std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o750))?;
    assert_eq!(mode_string(&std::fs::metadata(&file)?), "-rwxr-x---");
    assert!(mode_string(&std::fs::metadata(tempdir.path())?).starts_with('d'));
    Ok(())
}
