use std::hash::{DefaultHasher, Hash, Hasher};

/// Files that hold a stable, host-unique machine id on Linux systems.
const MACHINE_ID_PATHS: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Returns a 24-bit discriminator derived from the host, or `None` if neither
/// a machine id nor a host name can be found.
///
/// The machine id is preferred; the host name (`HOSTNAME`, `COMPUTERNAME`, or
/// `/etc/hostname`) is the fallback.
pub fn machine_discriminator() -> Option<u32> {
    MACHINE_ID_PATHS
        .iter()
        .find_map(|path| read_trimmed(path))
        .or_else(host_name)
        .map(|source| fold_24(&source))
}

/// Returns a 16-bit discriminator for the current process.
pub fn process_discriminator() -> u16 {
    // Truncation keeps the low, fastest-changing pid bits.
    (std::process::id() & 0xFFFF) as u16
}

fn host_name() -> Option<String> {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .or_else(|| read_trimmed("/etc/hostname"))
}

fn read_trimmed(path: &str) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn fold_24(source: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    let h = hasher.finish();
    ((h ^ (h >> 24) ^ (h >> 48)) & 0xFF_FFFF) as u32
}
