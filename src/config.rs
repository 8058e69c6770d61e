//! Generator configuration.

use crate::error::{Error, Result};

/// Which verifier-assist frame format the target uses. The generator does
/// not emit frames; the format only restricts subroutine finalizers, which
/// frame-based verification cannot check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackMapFormat {
    #[default]
    None,
    Cldc,
    Jsr202,
}

/// Switches that shape the generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Emit the line-number table.
    pub line_debug_info: bool,
    /// Emit the local-variable table and keep constant locals in slots.
    pub var_debug_info: bool,
    /// Emit the character-range table.
    pub gen_crt: bool,
    /// Trace every emitted instruction at `trace` level.
    pub debug_code: bool,
    pub stack_map: StackMapFormat,
    /// Finalizer complexity above which a subroutine replaces inline copies.
    /// Zero or less always uses subroutines; 100 or more never does.
    pub jsr_limit: i32,
    /// Re-own member references to the qualifying type.
    pub obey_binary_compatibility: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            line_debug_info: true,
            var_debug_info: false,
            gen_crt: false,
            debug_code: false,
            stack_map: StackMapFormat::None,
            jsr_limit: 50,
            obey_binary_compatibility: true,
        }
    }
}

impl Config {
    /// Builds a configuration from compiler-style switches:
    /// `-g`, `-g:none`, `-g:lines,vars,source`, `-Xjcov`,
    /// `-XDdebugcode`, `-XDjsrlimit=N` and `-stackmap:{none,cldc,jsr202}`.
    pub fn from_options(options: &[&str]) -> Result<Self> {
        let mut config = Config::default();
        for &opt in options {
            match opt {
                "-g" => {
                    config.line_debug_info = true;
                    config.var_debug_info = true;
                }
                "-g:none" => {
                    config.line_debug_info = false;
                    config.var_debug_info = false;
                }
                "-Xjcov" => config.gen_crt = true,
                "-XDdebugcode" => config.debug_code = true,
                _ if opt.starts_with("-g:") => {
                    config.line_debug_info = false;
                    config.var_debug_info = false;
                    for key in opt["-g:".len()..].split(',') {
                        match key {
                            "lines" => config.line_debug_info = true,
                            "vars" => config.var_debug_info = true,
                            "source" => {}
                            other => {
                                return Err(Error::config(format!("unknown debug info kind `{}`", other)))
                            }
                        }
                    }
                }
                _ if opt.starts_with("-XDjsrlimit=") => {
                    let value = &opt["-XDjsrlimit=".len()..];
                    config.jsr_limit = value
                        .parse()
                        .map_err(|_| Error::config(format!("jsrlimit expects an integer, got `{}`", value)))?;
                }
                _ if opt.starts_with("-stackmap:") => {
                    config.stack_map = match &opt["-stackmap:".len()..] {
                        "none" => StackMapFormat::None,
                        "cldc" => StackMapFormat::Cldc,
                        "jsr202" => StackMapFormat::Jsr202,
                        other => {
                            return Err(Error::config(format!("unknown stack map format `{}`", other)))
                        }
                    };
                }
                other => return Err(Error::config(format!("unrecognized option `{}`", other))),
            }
        }
        log::debug!("generator config: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_compiler_defaults() {
        let c = Config::default();
        assert!(c.line_debug_info);
        assert!(!c.var_debug_info);
        assert_eq!(c.jsr_limit, 50);
        assert_eq!(c.stack_map, StackMapFormat::None);
    }

    #[test]
    fn parses_debug_switches() {
        let c = Config::from_options(&["-g:vars"]).unwrap();
        assert!(!c.line_debug_info);
        assert!(c.var_debug_info);

        let c = Config::from_options(&["-g", "-Xjcov", "-XDjsrlimit=0", "-stackmap:jsr202"]).unwrap();
        assert!(c.line_debug_info && c.var_debug_info && c.gen_crt);
        assert_eq!(c.jsr_limit, 0);
        assert_eq!(c.stack_map, StackMapFormat::Jsr202);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(Config::from_options(&["-XDjsrlimit=lots"]), Err(Error::Config { .. })));
        assert!(matches!(Config::from_options(&["-stackmap:full"]), Err(Error::Config { .. })));
        assert!(matches!(Config::from_options(&["--fast"]), Err(Error::Config { .. })));
    }
}
