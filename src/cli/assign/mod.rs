//! Assign command - resolves one experiment through the registry

use std::str::FromStr;

use clap::Args;

use crate::domain::experiment::{Experiment, Variant, EMPTY_VARIANT_NAME};
use crate::infrastructure::experiment::SeededRandom;
use crate::infrastructure::services::ExperimentRegistry;

use super::{init, open_store};

/// Arguments for the assign command
#[derive(Args, Clone)]
pub struct AssignArgs {
    /// Experiment name
    pub experiment: String,

    /// Variant as `name:ratio`, repeatable, in selection order
    #[arg(long = "variant", short = 'v', required = true)]
    pub variants: Vec<VariantArg>,

    /// Seed for a reproducible draw
    #[arg(long)]
    pub seed: Option<u64>,
}

/// A `name:ratio` pair given on the command line
#[derive(Debug, Clone, PartialEq)]
pub struct VariantArg {
    pub name: String,
    pub ratio: f64,
}

impl FromStr for VariantArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, ratio) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected name:ratio, got '{}'", s))?;
        let ratio = ratio
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid ratio '{}': {}", ratio, e))?;

        Ok(Self {
            name: name.trim().to_string(),
            ratio,
        })
    }
}

/// Resolve the experiment and print the assigned variant
///
/// Prints the empty variant's name when the draw falls outside every ratio.
pub fn run(args: AssignArgs) -> anyhow::Result<()> {
    let config = init();
    let store = open_store(&config)?;

    let experiment = Experiment::new(args.experiment.clone(), |_, _: &mut Experiment<String>| Ok(()))
        .with_variants(
            args.variants
                .iter()
                .map(|v| Variant::new(v.name.clone(), v.ratio, v.name.clone())),
        );

    let mut builder = ExperimentRegistry::builder()
        .experiment(args.experiment.clone(), experiment)
        .storage(store)
        .persist_key(config.storage.persist_key.clone());
    if let Some(seed) = args.seed {
        builder = builder.random_source(SeededRandom::new(seed));
    }
    let registry = builder.build()?;

    let variant =
        registry.get_current_value_for(&args.experiment, EMPTY_VARIANT_NAME.to_string());
    println!("{}", variant);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variant_arg() {
        assert_eq!(
            "green:0.25".parse::<VariantArg>().unwrap(),
            VariantArg {
                name: "green".to_string(),
                ratio: 0.25
            }
        );
        assert_eq!("a:b:1".parse::<VariantArg>().unwrap().name, "a:b");
    }

    #[test]
    fn test_parse_variant_arg_errors() {
        assert!("green".parse::<VariantArg>().is_err());
        assert!("green:lots".parse::<VariantArg>().is_err());
    }
}
