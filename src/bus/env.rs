use super::Bus;

/// Cached env-var parsed as `Option<usize>` with a non-zero filter.
macro_rules! env_option_usize {
    ($name:ident, $var:expr) => {
        pub(crate) fn $name() -> Option<usize> {
            use std::sync::OnceLock;
            static V: OnceLock<Option<usize>> = OnceLock::new();
            *V.get_or_init(|| {
                std::env::var($var)
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .filter(|&v| v > 0)
            })
        }
    };
}

impl Bus {
    env_option_usize!(env_cart_ram_override, "VB_CART_RAM");

    /// Default keypad state before the host supplies one (hex).
    #[inline]
    pub(crate) fn env_pad_default() -> u16 {
        use std::sync::OnceLock;
        static V: OnceLock<u16> = OnceLock::new();
        *V.get_or_init(|| {
            std::env::var("VB_PAD_DEFAULT")
                .ok()
                .and_then(|s| u16::from_str_radix(&s, 16).ok())
                .unwrap_or(0)
        })
    }
}
