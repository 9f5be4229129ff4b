//! **specializer** - Build-time permutation specializer for JavaScript
//!
//! Rewrites conditional-build queries (`isSet`, `getValue`, `select`,
//! `has`) into literal values for one combination of build flags, so a
//! downstream minifier can drop the dead branches.

/// Error types and miette diagnostics
pub mod error;
pub use error::{Result, SpecializeError, SyntaxError};

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Script tree, tree-sitter lowering and compact printing
pub mod syntax {
    /// Arena tree with parent links and checked child replacement
    pub mod tree;
    pub use tree::{Literal, Node, NodeId, NodeKind, Tree};

    /// tree-sitter JavaScript front end
    pub mod parser;
    pub use parser::{ExpressionParser, ScriptParser};

    /// Whitespace-minimal source printer
    pub mod printer;
    pub use printer::{print, print_node};
}

/// Specialization pipeline
pub mod core {
    /// Flag values and combinations with canonical keys
    pub mod combination;
    pub use combination::{Combination, FlagValue};

    /// Permutations, checksums and the shared permutation cache
    pub mod permutation;
    pub use permutation::{Permutation, PermutationCache, checksum_of_key};

    /// Query vocabulary and call-shape detection
    pub mod query;
    pub use query::{QueryDetector, QueryFunction, QueryShape, QueryVocabulary};

    /// In-place rewriting of query calls
    pub mod patch;
    pub use patch::PatchEngine;

    /// Key discovery over a script
    pub mod preflight;
    pub use preflight::preflight;

    /// Scan, plan and parallel build over a source file
    pub mod specialize;
    pub use specialize::{Plan, Specialized, Specializer, render_file_name};
}

/// Infrastructure - Configuration, I/O, and utilities
pub mod infra {
    /// Layered configuration (file + environment)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Memory-mapped file I/O for large scripts
    pub mod io;
    pub use io::{FileContent, read_file_smart, write_output};

    /// Byte offset to line/column mapping for diagnostics
    pub mod line_index;
    pub use line_index::NewlineIndex;

    /// Gitignore-aware script discovery
    pub mod walk;
    pub use walk::FileWalker;

    /// Path and color helpers for the command layer
    pub mod utils;
}

/// Subcommand entry points
pub mod cli_ext {
    pub mod build_cmd;
    pub mod checksum_cmd;
    pub mod patch_cmd;
    pub mod preflight_cmd;
}

pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{Combination, FlagValue, Permutation, QueryVocabulary, Specializer};
pub use infra::{Config, FileWalker, load_config};
