//! Engine configuration. See spec [9] Open Questions — the kernel load
//! address used to be hard-coded; this resolves that REDESIGN FLAG by
//! making it (and the rest of the image layout) an overridable value
//! supplied at construction, serde-deserializable like the teacher's
//! optional `serde` feature on `Header`/`Message`.

/// PCM image layout and unlock parameters known ahead of a session, either
/// from vehicle identification or from prior configuration. See spec [3]
/// `PcmInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcmInfo {
    /// Base address of the flash image inside the PCM's address space.
    pub image_base_address: u32,
    /// Size in bytes of the flash image to read out.
    pub image_size: u32,
    /// Selects which family-specific seed/key algorithm to use.
    pub key_algorithm_id: u16,
}

/// Default kernel RAM load address, per spec [4.5] `ReadContents` /
/// [9] Open Questions. Overridable via [`EngineConfig::kernel_load_address`].
pub const DEFAULT_KERNEL_LOAD_ADDRESS: u32 = 0xFF_913E;

/// Engine-wide configuration independent of any single PCM's image layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Address the kernel payload is uploaded to and executed from.
    pub kernel_load_address: u32,
    /// How often, in successful read blocks, to emit a ToolPresent keep-alive
    /// during `read_contents`. See spec [4.5] step 7.
    pub tool_present_interval_blocks: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kernel_load_address: DEFAULT_KERNEL_LOAD_ADDRESS,
            tool_present_interval_blocks: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_constant() {
        assert_eq!(EngineConfig::default().kernel_load_address, 0xFF_913E);
    }
}
