use crate::Affixes;
use chrono::Datelike;
use std::path::{Path, PathBuf};

/// Represents a randomly generated file name.
///
/// The name is `prefix`, the local date as years since 1900, zero-based month
/// and day of month, then `-<pid>-`, a base-36 random token and `suffix`.
pub(crate) struct RandomName {
    name: String,
}

impl RandomName {
    pub fn new(prefix: &str, suffix: &str) -> Self {
        let today = chrono::Local::now();
        let pid = std::process::id();
        let token = to_base36(u64::from(random_u32()) + 1);

        Self {
            name: format!(
                "{}{}{}{}-{}-{}{}",
                prefix,
                today.year() - 1900,
                today.month0(),
                today.day(),
                pid,
                token,
                suffix
            ),
        }
    }
}

impl AsRef<str> for RandomName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// Generates a path for a new resource from the given affixes.
///
/// This never touches the file system; the caller is expected to create the
/// resource exclusively and treat an existing path as a collision.
pub(crate) fn generate(affixes: &Affixes, default_prefix: &str, default_dir: &Path) -> PathBuf {
    let name = RandomName::new(affixes.prefix_or(default_prefix), affixes.suffix_or_empty());
    affixes
        .dir_override()
        .unwrap_or(default_dir)
        .join(name.as_ref())
}

#[cfg(feature = "uuid")]
fn random_u32() -> u32 {
    // The low 32 bits of a v4 UUID carry no version or variant bits.
    uuid::Uuid::new_v4().as_u128() as u32
}

#[cfg(not(feature = "uuid"))]
fn random_u32() -> u32 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::SystemTime;

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(std::time::Duration::from_secs(0));
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

    // Using the address of a local variable for extra variation.
    let marker = &seq as *const _ as usize;

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(now.as_nanos());
    hasher.write_u64(seq);
    hasher.write_usize(marker);
    hasher.finish() as u32
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize] as char);
        value /= 36;
    }
    digits.iter().rev().collect()
}
