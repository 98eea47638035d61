//! Knobs for navigation queries.

/// Options shared by every query run through an [`Analysis`](super::Analysis).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeOptions {
    pub implementation: ImplementationOptions,
    pub extract: ExtractOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationOptions {
    /// Report interfaces that satisfy (or are satisfied by) an interface
    /// query. Off by default: only interface/concrete pairs are reported.
    pub include_interface_pairs: bool,
    /// Skip queries whose type has no methods; every type satisfies them.
    pub suppress_empty_interfaces: bool,
}

impl Default for ImplementationOptions {
    fn default() -> Self {
        Self {
            include_interface_pairs: false,
            suppress_empty_interfaces: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// One level of indentation in generated code.
    pub indent: String,
    /// Base name of extracted variables and constants.
    pub var_name: String,
    pub func_name: String,
    pub method_name: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            indent: "\t".to_string(),
            var_name: "x".to_string(),
            func_name: "newFunction".to_string(),
            method_name: "newMethod".to_string(),
        }
    }
}
