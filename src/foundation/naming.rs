use std::sync::atomic::{AtomicU32, Ordering};

static SEQ: AtomicU32 = AtomicU32::new(0);

/// `<prefix>_<YYYYmmdd_HHMMSS>_<hex>.<ext>`, unique within the process.
pub fn timestamped_name(prefix: &str, ext: &str) -> String {
    format!("{}.{ext}", timestamped_stem(prefix))
}

/// `<prefix>_<YYYYmmdd_HHMMSS>_<hex>` without an extension, for directories.
pub fn timestamped_stem(prefix: &str) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("{prefix}_{stamp}_{}", unique_suffix())
}

/// Short hex token built from the process id and a process-wide counter.
pub fn unique_suffix() -> String {
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let mixed = (std::process::id() << 12) ^ seq.wrapping_mul(0x9E37);
    format!("{:06x}", mixed & 0x00ff_ffff)
}
