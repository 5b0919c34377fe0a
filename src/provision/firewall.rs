//! ufw rules for the lab network.

use crate::config::ProvisionConfig;
use crate::error::ProvisorError;
use crate::steps::Step;

/// Rules to allow, in the order they are added.
pub fn firewall_rules(config: &ProvisionConfig) -> Vec<String> {
    let mut rules = vec![
        "22/tcp".to_string(),
        "5432/tcp".to_string(),
        format!("{}/tcp", config.gateway_port),
        "80/tcp".to_string(),
        "443/tcp".to_string(),
    ];
    if config.enable_hotspot {
        // DNS and DHCP for hotspot clients
        rules.push("53/udp".to_string());
        rules.push("67/udp".to_string());
    }
    rules
}

/// Whether `ufw status` output shows the firewall active with every rule.
fn status_covers(status: &str, rules: &[String]) -> bool {
    let active = status
        .lines()
        .any(|line| line.trim() == "Status: active");
    active
        && rules.iter().all(|rule| {
            status
                .lines()
                .any(|line| line.split_whitespace().next() == Some(rule.as_str()))
        })
}

/// Enable ufw and open the lab's ports.
pub fn firewall(config: &ProvisionConfig) -> Step {
    let rules = firewall_rules(config);
    let verify_rules = rules.clone();

    Step::new("firewall")
        .requires(["system_packages"])
        .critical(false)
        .description("Configure firewall")
        .verify(move |ctx| match ctx.probe("ufw", &["status"]) {
            Ok(result) => Ok(result.success && status_covers(&result.stdout, &verify_rules)),
            Err(ProvisorError::LaunchFailure { .. }) => Ok(false),
            Err(e) => Err(e),
        })
        .apply(move |ctx| {
            ctx.run("ufw", &["--force", "enable"])?;
            for rule in &rules {
                ctx.run("ufw", &["allow", rule.as_str()])?;
            }
            Ok(())
        })
}
