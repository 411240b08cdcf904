//! Template rendering for generated environment files
//!
//! Templates are embedded in the binary (`src/tmpl/*.tera`) and compiled
//! lazily, once per name, by a [`GenerationContext`]. The context also owns the
//! scratch buffer output is rendered into, so a render never touches the
//! filesystem until it has fully succeeded. Each concurrent generation pass
//! needs its own context.
//!
//! # Embedded templates
//!
//! | Name | Output |
//! |---|---|
//! | `shell.nix` | legacy `shell.nix` for `use nix` direnv setups |
//! | `gitignore` | `.gitignore` for the state directory |
//! | `flake` | primary `flake.nix` |
//! | `flake_remove_nixpkgs` | `flake.nix` variant importing nixpkgs as a plain source |
//! | `glibc-patch` | `flake.nix` of the glibc patch flake |

mod functions;

use crate::error::{Error, Result};
use crate::sync::{self, SyncOutcome};
use camino::Utf8Path;
use rust_embed::RustEmbed;
use std::borrow::Cow;
use std::collections::HashSet;
use tera::{Context, Tera};
use tracing::debug;

/// Embedded templates and scripts
#[derive(RustEmbed)]
#[folder = "src/tmpl/"]
struct EmbeddedTemplates;

/// File name suffix of embedded templates
const TEMPLATE_SUFFIX: &str = ".tera";

/// Mode of files rendered from templates
pub const FILE_MODE: u32 = 0o644;

/// Names of all embedded templates
pub fn template_names() -> Vec<String> {
    let mut names: Vec<String> = EmbeddedTemplates::iter()
        .filter_map(|file| file.strip_suffix(TEMPLATE_SUFFIX).map(str::to_string))
        .collect();
    names.sort();
    names
}

/// Raw bytes of an embedded non-template asset, e.g. a script
pub fn embedded_asset(name: &str) -> Option<Cow<'static, [u8]>> {
    EmbeddedTemplates::get(name).map(|file| file.data)
}

/// Compiled-template cache and render buffer for one generation pass
pub struct GenerationContext {
    tera: Tera,
    compiled: HashSet<String>,
    buf: Vec<u8>,
    debug: bool,
}

impl GenerationContext {
    /// Create a context; `debug` is what the templates' `debug()` returns
    pub fn new(debug: bool) -> Self {
        let mut tera = Tera::default();
        functions::register(&mut tera, debug);
        Self {
            tera,
            compiled: HashSet::new(),
            buf: Vec::new(),
            debug,
        }
    }

    /// Whether `name` has already been compiled by this context
    pub fn is_compiled(&self, name: &str) -> bool {
        self.compiled.contains(name)
    }

    fn compile(&mut self, name: &str) -> Result<()> {
        if self.compiled.contains(name) {
            return Ok(());
        }

        let file = format!("{}{}", name, TEMPLATE_SUFFIX);
        let asset =
            EmbeddedTemplates::get(&file).ok_or_else(|| Error::template_not_found(name))?;
        let source = std::str::from_utf8(asset.data.as_ref()).map_err(|e| Error::TemplateParse {
            template: name.to_string(),
            source: tera::Error::msg(format!("invalid UTF-8: {}", e)),
        })?;

        self.tera
            .add_raw_template(name, source)
            .map_err(|source| Error::TemplateParse {
                template: name.to_string(),
                source,
            })?;
        self.compiled.insert(name.to_string());
        debug!("compiled template {}", name);
        Ok(())
    }

    /// Render `name` into the scratch buffer and return its bytes.
    pub fn render(&mut self, name: &str, context: &Context) -> Result<&[u8]> {
        self.compile(name)?;
        self.buf.clear();
        self.tera
            .render_to(name, context, &mut self.buf)
            .map_err(|source| Error::TemplateRender {
                template: name.to_string(),
                source,
            })?;
        Ok(&self.buf)
    }

    /// Render `template` and synchronize it to `target_dir/output_name`.
    ///
    /// The file is only opened after rendering succeeded, and only written
    /// if its content differs.
    pub fn write_from_template(
        &mut self,
        target_dir: &Utf8Path,
        context: &Context,
        template: &str,
        output_name: &str,
    ) -> Result<SyncOutcome> {
        let path = target_dir.join(output_name);
        let data = self.render(template, context)?;
        let outcome =
            sync::write_if_changed(&path, data, FILE_MODE).map_err(|source| Error::WriteOutput {
                template: template.to_string(),
                path: path.clone(),
                source,
            })?;
        debug!("synchronized {} from template {} ({:?})", path, template, outcome);
        Ok(outcome)
    }
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self::new(false)
    }
}

impl std::fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationContext")
            .field("compiled", &self.compiled)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{BuildPlan, FlakeInput, NixpkgsInfo, PlanPackage};
    use crate::sync::ContentChange;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn sample_plan() -> BuildPlan {
        BuildPlan {
            nixpkgs: NixpkgsInfo {
                url: "github:NixOS/nixpkgs/f80ac848e3d6f0c12c52758c0f25c10c97ca3b62".to_string(),
                commit_hash: "f80ac848e3d6f0c12c52758c0f25c10c97ca3b62".to_string(),
            },
            system: "x86_64-linux".to_string(),
            flake_inputs: vec![
                FlakeInput {
                    name: "nixpkgs-f80ac8".to_string(),
                    url: "github:NixOS/nixpkgs/f80ac848e3d6f0c12c52758c0f25c10c97ca3b62"
                        .to_string(),
                    packages: vec!["hello".to_string(), "ripgrep".to_string()],
                },
                FlakeInput {
                    name: "process-compose".to_string(),
                    url: "github:F1bonacc1/process-compose/v1.9.0".to_string(),
                    packages: vec!["default".to_string()],
                },
            ],
            packages: vec![PlanPackage {
                name: "hello".to_string(),
                installable: "nixpkgs#hello".to_string(),
                patch_glibc: false,
            }],
            env: [("LANG".to_string(), "C.UTF-8".to_string())].into(),
        }
    }

    fn temp_dir(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_embedded_templates_compile() {
        let mut ctx = GenerationContext::default();
        let names = template_names();
        assert_eq!(
            names,
            vec![
                "flake",
                "flake_remove_nixpkgs",
                "gitignore",
                "glibc-patch",
                "shell.nix"
            ]
        );
        for name in &names {
            ctx.compile(name).unwrap();
            assert!(ctx.is_compiled(name));
        }
    }

    #[test]
    fn test_render_flake() {
        let mut ctx = GenerationContext::default();
        let plan = sample_plan();
        let out = ctx
            .render("flake", &plan.template_context().unwrap())
            .unwrap()
            .to_vec();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains(
            "nixpkgs.url = \"github:NixOS/nixpkgs/f80ac848e3d6f0c12c52758c0f25c10c97ca3b62\";"
        ));
        assert!(out.contains("nixpkgs-f80ac8.legacyPackages.x86_64-linux.hello"));
        assert!(out.contains("nixpkgs-f80ac8.legacyPackages.x86_64-linux.ripgrep"));
        assert!(out.contains("process-compose.packages.x86_64-linux.default"));
        assert!(out.contains(r#"builtins.fromJSON ''{"LANG":"C.UTF-8"}''"#));
        assert!(!out.contains("glibc-patch"));
    }

    #[test]
    fn test_render_flake_remove_nixpkgs() {
        let mut ctx = GenerationContext::default();
        let plan = sample_plan();
        let out = ctx
            .render("flake_remove_nixpkgs", &plan.template_context().unwrap())
            .unwrap()
            .to_vec();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("flake = false;"));
        assert!(out.contains("import nixpkgs"));
    }

    #[test]
    fn test_env_cannot_break_out_of_nix_string() {
        let mut plan = sample_plan();
        plan.env = [("PS1".to_string(), "it''s ${USER}".to_string())].into();
        let context = plan.template_context().unwrap();

        for template in ["flake", "flake_remove_nixpkgs"] {
            let out = GenerationContext::default()
                .render(template, &context)
                .unwrap()
                .to_vec();
            let out = String::from_utf8(out).unwrap();
            let line = out
                .lines()
                .find(|l| l.contains("builtins.fromJSON"))
                .unwrap()
                .trim();

            assert_eq!(
                line,
                r#"env = builtins.fromJSON ''{"PS1":"it\u0027\u0027s \u0024{USER}"}'';"#
            );
        }
    }

    #[test]
    fn test_debug_banner_only_in_debug_mode() {
        let plan = sample_plan();
        let context = plan.template_context().unwrap();

        let quiet = GenerationContext::new(false)
            .render("shell.nix", &context)
            .unwrap()
            .to_vec();
        assert!(!String::from_utf8(quiet).unwrap().contains("# plan packages:"));

        let loud = GenerationContext::new(true)
            .render("shell.nix", &context)
            .unwrap()
            .to_vec();
        assert!(String::from_utf8(loud).unwrap().contains("# plan packages:"));
    }

    #[test]
    fn test_unknown_template() {
        let mut ctx = GenerationContext::default();
        let err = ctx.render("devcontainer.json", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound { .. }));
    }

    #[test]
    fn test_render_failure_names_template() {
        let mut ctx = GenerationContext::default();
        let err = ctx.render("flake", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::TemplateRender { .. }));
        assert!(err.to_string().starts_with("execute template flake:"));
    }

    #[test]
    fn test_cache_reused_across_renders() {
        let mut ctx = GenerationContext::default();
        let context = sample_plan().template_context().unwrap();
        let first = ctx.render("gitignore", &context).unwrap().to_vec();
        assert!(ctx.is_compiled("gitignore"));
        assert!(!ctx.is_compiled("flake"));
        let second = ctx.render("gitignore", &context).unwrap().to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_from_template_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp_dir(&temp);
        let mut ctx = GenerationContext::default();
        let context = sample_plan().template_context().unwrap();

        let first = ctx
            .write_from_template(&dir, &context, "flake", "flake.nix")
            .unwrap();
        let second = ctx
            .write_from_template(&dir, &context, "flake", "flake.nix")
            .unwrap();

        assert_eq!(first.content, ContentChange::Created);
        assert!(second.is_noop());
    }

    #[test]
    fn test_failed_render_keeps_existing_output() {
        let temp = TempDir::new().unwrap();
        let dir = temp_dir(&temp);
        std::fs::write(dir.join("flake.nix"), "previous good output").unwrap();

        let mut ctx = GenerationContext::default();
        let result = ctx.write_from_template(&dir, &Context::new(), "flake", "flake.nix");

        assert!(result.is_err());
        assert_eq!(
            std::fs::read_to_string(dir.join("flake.nix")).unwrap(),
            "previous good output"
        );
    }

    #[test]
    fn test_glibc_script_is_embedded() {
        let script = embedded_asset("glibc-patch.bash").unwrap();
        assert!(script.starts_with(b"#!/usr/bin/env bash"));
    }
}
