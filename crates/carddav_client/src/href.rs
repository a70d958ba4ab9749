//! Names for newly created vCards

use rand::Rng;

/// Length of a generated name: three 8-digit hex groups and two hyphens
pub const HREF_LEN: usize = 3 * 8 + 2;

/// Source of file-name stems for new resources
pub trait HrefGenerator: Send + Sync {
    /// Produce a fresh candidate name (without the `.vcf` suffix)
    fn generate(&self) -> String;
}

/// Default generator backed by the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomHrefGenerator;

impl HrefGenerator for RandomHrefGenerator {
    fn generate(&self) -> String {
        random_href()
    }
}

/// Three random `u32`s as zero-padded hex, joined with `-`, upper-cased.
///
/// 96 bits of randomness; collisions are possible but the create path
/// retries with a new name when the server reports one.
pub fn random_href() -> String {
    let mut rng = rand::rng();
    format_href([rng.random(), rng.random(), rng.random()])
}

fn format_href(parts: [u32; 3]) -> String {
    parts
        .iter()
        .map(|n| format!("{n:08x}"))
        .collect::<Vec<_>>()
        .join("-")
        .to_uppercase()
}
