//! Registry pattern for resolving integrators by name

use super::{DormandPrince76, Integrator, RungeKuttaFehlberg78, RungeKuttaFourthOrder};
use bevy::prelude::*;
use std::collections::HashMap;

/// Names that are recognized but have no implementation.
const RESERVED: &[&str] = &["runge_kutta_56"];

/// Registry for runtime integrator lookup
#[derive(Resource)]
pub struct IntegratorRegistry {
    aliases: HashMap<String, String>,
}

impl IntegratorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            aliases: HashMap::new(),
        };

        registry.add_alias("rk4", "runge_kutta_fourth_order");
        registry.add_alias("rungekutta4", "runge_kutta_fourth_order");
        registry.add_alias("rkf78", "runge_kutta_fehlberg_78");
        registry.add_alias("rk78", "runge_kutta_fehlberg_78");
        registry.add_alias("rungekutta78", "runge_kutta_fehlberg_78");
        registry.add_alias("rungekuttafehlberg78", "runge_kutta_fehlberg_78");
        registry.add_alias("rkn76", "dormand_prince_76");
        registry.add_alias("dopri", "dormand_prince_76");
        registry.add_alias("dormand_prince", "dormand_prince_76");
        registry.add_alias("dormandprince", "dormand_prince_76");
        registry.add_alias("rk56", "runge_kutta_56");
        registry.add_alias("rungekutta56", "runge_kutta_56");

        registry
    }

    pub fn add_alias(&mut self, alias: &str, target: &str) {
        self.aliases.insert(alias.to_string(), target.to_string());
    }

    /// Canonical name for `name`, which may be an alias. Lookup ignores case.
    pub fn resolve(&self, name: &str) -> String {
        let lowered = name.trim().to_lowercase();
        self.aliases.get(&lowered).cloned().unwrap_or(lowered)
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Integrator>, String> {
        let resolved_name = self.resolve(name);

        match resolved_name.as_str() {
            "runge_kutta_fourth_order" => Ok(Box::new(RungeKuttaFourthOrder)),
            "runge_kutta_fehlberg_78" => Ok(Box::new(RungeKuttaFehlberg78)),
            "dormand_prince_76" => Ok(Box::new(DormandPrince76)),
            reserved if RESERVED.contains(&reserved) => Err(format!(
                "Integrator '{name}' is reserved but not implemented. Available integrators: {}",
                self.list_available().join(", ")
            )),
            _ => {
                let aliases: Vec<String> =
                    self.list_aliases().into_iter().map(|(alias, _)| alias).collect();
                Err(format!(
                    "Unknown integrator: '{}'. Available integrators: {}. Aliases: {}",
                    name,
                    self.list_available().join(", "),
                    aliases.join(", ")
                ))
            }
        }
    }

    pub fn list_available(&self) -> Vec<String> {
        vec![
            "runge_kutta_fourth_order".to_string(),
            "runge_kutta_fehlberg_78".to_string(),
            "dormand_prince_76".to_string(),
        ]
    }

    pub fn list_aliases(&self) -> Vec<(String, String)> {
        let mut aliases: Vec<(String, String)> = self
            .aliases
            .iter()
            .filter(|(_, target)| !RESERVED.contains(&target.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        aliases.sort_by(|a, b| a.0.cmp(&b.0));
        aliases
    }
}

impl Default for IntegratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
