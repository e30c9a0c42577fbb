// src/config.rs
//! Generation limits, branch probabilities and named profiles.
//!
//! Profiles are TOML files embedded in the binary at compile time. Fields
//! omitted from a TOML file inherit the `Default` impls below, which are the
//! "default" profile.

use serde::{Deserialize, Serialize};

/// Complete configuration for one generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    pub limits: Limits,
    pub prob: Probabilities,
}

/// Size limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Fewest top-level declarations before the entry function.
    pub min_top_level: usize,
    /// Most top-level declarations before the entry function.
    pub max_top_level: usize,
    /// Expression nesting depth after which only leaves are generated.
    pub max_depth: usize,
    /// Side-effect variable declarations allowed per namespace.
    pub max_var_decls: usize,
    /// Type parameters per class or function.
    pub max_type_params: usize,
    /// Parameters of generated function types.
    pub max_functional_params: usize,
    pub cls: ClassLimits,
    #[serde(rename = "fn")]
    pub func: FuncLimits,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_top_level: 5,
            max_top_level: 10,
            max_depth: 6,
            max_var_decls: 3,
            max_type_params: 3,
            max_functional_params: 3,
            cls: ClassLimits::default(),
            func: FuncLimits::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassLimits {
    pub max_fields: usize,
    pub max_funcs: usize,
}

impl Default for ClassLimits {
    fn default() -> Self {
        Self {
            max_fields: 2,
            max_funcs: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuncLimits {
    pub max_params: usize,
    /// Extra expressions evaluated for effect in a block body.
    pub max_side_effects: usize,
}

impl Default for FuncLimits {
    fn default() -> Self {
        Self {
            max_params: 2,
            max_side_effects: 1,
        }
    }
}

/// Branch probabilities. These shape the output distribution only; no
/// value here affects whether a program is well typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Probabilities {
    /// Expression body instead of a block, when the function allows it.
    pub function_expr: f64,
    /// A generated type parameter receives an upper bound.
    pub bounded_type_parameters: f64,
    /// A top-level function or method is generic.
    pub parameterized_functions: f64,
    /// A SAM-typed value is built as a lambda instead of `new`.
    pub sam_coercion: f64,
    /// A function-typed value is a function reference instead of a lambda.
    pub func_ref: f64,
    /// A call goes through a function-typed variable when one fits.
    pub func_ref_call: f64,
    /// Reuse an in-scope variable of the exact type instead of building a value.
    pub existing_var: f64,
    /// Narrow the requested type to a random subtype.
    pub subtype_narrowing: f64,
    /// A function returns one of its own parameter types.
    pub return_param_type: f64,
    /// Function parameters carry default values.
    pub default_params: f64,
    /// An abstract method has no body.
    pub abstract_body: f64,
    /// A block body ends with a loop.
    pub loop_in_body: f64,
    /// A loop body appends to a string variable.
    pub loop_string_concat: f64,
    /// Choice between loop shapes: for vs while, while vs do-while.
    pub loop_shape: f64,
    /// A context type parameter is the only candidate type.
    pub type_params_only: f64,
    /// Wrap an expression in a fresh local declaration.
    pub side_effect_decl: f64,
}

impl Default for Probabilities {
    fn default() -> Self {
        Self {
            function_expr: 0.5,
            bounded_type_parameters: 0.5,
            parameterized_functions: 0.3,
            sam_coercion: 0.5,
            func_ref: 0.5,
            func_ref_call: 0.5,
            existing_var: 0.7,
            subtype_narrowing: 0.5,
            return_param_type: 0.5,
            default_params: 0.75,
            abstract_body: 0.5,
            loop_in_body: 0.5,
            loop_string_concat: 0.69,
            loop_shape: 0.43,
            type_params_only: 0.5,
            side_effect_decl: 0.5,
        }
    }
}

/// Error type for profile lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnknownProfileError {
    #[error("unknown profile '{0}', available profiles: {list}", list = available_profiles().join(", "))]
    Unknown(String),
    #[error("failed to read profile file '{path}': {reason}")]
    Read { path: String, reason: String },
    #[error("failed to parse profile '{name}': {reason}")]
    Parse { name: String, reason: String },
}

// Embedded profile TOML data (compiled into the binary).
static PROFILES: &[(&str, &str)] = &[
    ("default", include_str!("../profiles/default.toml")),
    ("small", include_str!("../profiles/small.toml")),
    ("deep", include_str!("../profiles/deep.toml")),
    (
        "generics-heavy",
        include_str!("../profiles/generics-heavy.toml"),
    ),
];

/// Returns a list of available profile names.
pub fn available_profiles() -> Vec<&'static str> {
    PROFILES.iter().map(|(name, _)| *name).collect()
}

fn parse_profile_toml(name: &str, toml_str: &str) -> Result<GenConfig, UnknownProfileError> {
    toml::from_str(toml_str).map_err(|e| UnknownProfileError::Parse {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Get a profile by name, or load it from a file path.
///
/// `name_or_path` is a path when it contains `/` or ends with `.toml`.
pub fn get_profile(name_or_path: &str) -> Result<GenConfig, UnknownProfileError> {
    if name_or_path.contains('/') || name_or_path.ends_with(".toml") {
        let content =
            std::fs::read_to_string(name_or_path).map_err(|e| UnknownProfileError::Read {
                path: name_or_path.to_string(),
                reason: e.to_string(),
            })?;
        return parse_profile_toml(name_or_path, &content);
    }
    PROFILES
        .iter()
        .find(|(name, _)| *name == name_or_path)
        .map(|(name, toml_str)| parse_profile_toml(name, toml_str))
        .unwrap_or_else(|| Err(UnknownProfileError::Unknown(name_or_path.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_default_impl() {
        let profile = get_profile("default").expect("default profile should exist");
        assert_eq!(profile, GenConfig::default());
    }

    #[test]
    fn all_embedded_profiles_parse() {
        for name in available_profiles() {
            let profile = get_profile(name).unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(
                profile.limits.min_top_level <= profile.limits.max_top_level,
                "{name}: top-level range is inverted"
            );
            for p in [
                profile.prob.function_expr,
                profile.prob.sam_coercion,
                profile.prob.loop_shape,
                profile.prob.loop_string_concat,
            ] {
                assert!((0.0..=1.0).contains(&p), "{name}: probability {p} out of range");
            }
        }
    }

    #[test]
    fn small_profile_shrinks_programs() {
        let small = get_profile("small").expect("small profile should exist");
        assert!(small.limits.max_top_level < GenConfig::default().limits.max_top_level);
        assert!(small.limits.max_depth < GenConfig::default().limits.max_depth);
    }

    #[test]
    fn omitted_fields_inherit_defaults() {
        let cfg: GenConfig = toml::from_str("[limits]\nmax_depth = 2\n[limits.fn]\nmax_params = 4\n")
            .expect("valid toml");
        assert_eq!(cfg.limits.max_depth, 2);
        assert_eq!(cfg.limits.func.max_params, 4);
        assert_eq!(cfg.limits.func.max_side_effects, 1);
        assert_eq!(cfg.prob, Probabilities::default());
    }

    #[test]
    fn unknown_profile_lists_available_names() {
        let err = get_profile("nonexistent").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nonexistent"));
        assert!(msg.contains("default"));
    }

    #[test]
    fn profile_file_paths_are_read_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[prob]\nsam_coercion = 0.0\n").expect("write profile");
        let cfg = get_profile(path.to_str().expect("utf-8 path")).expect("profile loads");
        assert_eq!(cfg.prob.sam_coercion, 0.0);

        let missing = get_profile("/definitely/missing.toml").unwrap_err();
        assert!(matches!(missing, UnknownProfileError::Read { .. }));
    }
}
