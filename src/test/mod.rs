//! Test support: crafted in-memory .NET images.
//!
//! Unit tests across the crate need real PE bytes to load, patch and write back. Rather than
//! shipping binary samples, [`CraftedAssembly`] assembles a minimal single-section PE32 image
//! with a CLR header, metadata root, the tables up to `MemberRef` and tiny/fat method bodies.


pub(crate) use builder::*;

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::{deobfuscation::decode_module, Module};

    /// Images under `tests/fixtures`, used by the binary tests, and the builders behind them.
    fn fixtures() -> Vec<(&'static str, CraftedAssembly)> {
        vec![
            ("sample.exe", CraftedAssembly::sample()),
            ("shared.exe", CraftedAssembly::shared_literal()),
            ("plain.exe", CraftedAssembly::undecodable()),
        ]
    }

    fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn fixtures_load_like_their_builders() {
        for (name, crafted) in fixtures() {
            let mut fixture = Module::from_file(&fixture_path(name)).unwrap();
            let mut built = Module::from_mem(crafted.build()).unwrap();

            let shape = |module: &Module| {
                module
                    .methods()
                    .map(|(ty, method)| {
                        (
                            ty.full_name(),
                            method.token,
                            method.name.clone(),
                            method.body.as_ref().map(|body| body.instructions.clone()),
                        )
                    })
                    .collect::<Vec<_>>()
            };
            assert_eq!(shape(&fixture), shape(&built), "{name}");
            assert_eq!(decode_module(&mut fixture), decode_module(&mut built), "{name}");
        }
    }

    #[test]
    #[ignore = "rewrites tests/fixtures from the builders"]
    fn regenerate_fixtures() {
        for (name, crafted) in fixtures() {
            std::fs::write(fixture_path(name), crafted.build()).unwrap();
        }
    }
}
