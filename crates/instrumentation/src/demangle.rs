//! Name demangling: given a linkage name, return a human-readable one.
//! Without an ABI demangler linked into this build, [`GenericDemangler`]
//! recognizes a symbol's mangling scheme but can only sanitize and pass the
//! name through unchanged; a host toolchain with a real demangler can
//! substitute its own [`Demangler`].

pub trait Demangler {
    fn demangle(&self, linkage_name: &str) -> String;
}

/// Strips control characters, and recognizes but does not decode Itanium
/// C++ (`_Z...`) and Swift (`_$s...`) mangling schemes.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericDemangler;

impl GenericDemangler {
    fn is_recognized_scheme(name: &str) -> bool {
        name.starts_with("_Z") || name.starts_with("_$s") || name.starts_with("$s") || name.starts_with("_T0")
    }
}

impl Demangler for GenericDemangler {
    fn demangle(&self, linkage_name: &str) -> String {
        let sanitized: String = linkage_name.chars().filter(|c| !c.is_control()).collect();
        if Self::is_recognized_scheme(&sanitized) {
            log::trace!("recognized mangling scheme for {sanitized}, no demangler linked");
        }
        sanitized
    }
}
