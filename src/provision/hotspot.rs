//! WiFi access point on `wlan0`.

use crate::config::ProvisionConfig;
use crate::error::Result;
use crate::steps::check::{command_succeeds, file_contains_all, file_has_content, missing_lines};
use crate::steps::Step;

use super::{template_vars, templates, HostPaths};

pub const HOSTAPD_CONF: &str = "/etc/hostapd/hostapd.conf";
pub const DNSMASQ_CONF: &str = "/etc/dnsmasq.conf";
pub const DHCPCD_CONF: &str = "/etc/dhcpcd.conf";

const SERVICES: [&str; 2] = ["hostapd", "dnsmasq"];

/// Configure hostapd, dnsmasq and a static `wlan0` address.
///
/// The hotspot comes up after the next reboot.
pub fn wifi_hotspot(config: &ProvisionConfig, paths: &HostPaths) -> Result<Step> {
    let vars = template_vars(config);
    let hostapd = (paths.host(HOSTAPD_CONF), templates::render("hostapd.conf", &vars)?);
    let dnsmasq = (paths.host(DNSMASQ_CONF), templates::render("dnsmasq.conf", &vars)?);
    let dhcpcd_path = paths.host(DHCPCD_CONF);
    let dhcpcd_block = templates::render("dhcpcd.conf", &vars)?;
    let dhcpcd_lines: Vec<String> = dhcpcd_block.lines().map(str::to_string).collect();

    let files = [hostapd, dnsmasq];
    let verify_files = files.clone();
    let verify_dhcpcd = dhcpcd_path.clone();

    Ok(Step::new("wifi_hotspot")
        .requires(["system_packages"])
        .critical(false)
        .description("Configure WiFi hotspot")
        .verify(move |ctx| {
            if !verify_files
                .iter()
                .all(|(path, content)| file_has_content(path, content))
            {
                return Ok(false);
            }
            if !file_contains_all(&verify_dhcpcd, &dhcpcd_lines) {
                return Ok(false);
            }
            for service in SERVICES {
                if !command_succeeds(ctx, "systemctl", &["is-enabled", "--quiet", service])? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
        .apply(move |ctx| {
            for (path, content) in &files {
                ctx.write_file(path, content)?;
            }

            let existing = ctx.read_file(&dhcpcd_path)?.unwrap_or_default();
            let wanted: Vec<&str> = dhcpcd_block.lines().collect();
            if !missing_lines(&existing, &wanted).is_empty() {
                ctx.append_file(&dhcpcd_path, &format!("\n{}", dhcpcd_block))?;
            }

            for service in SERVICES {
                ctx.run("systemctl", &["enable", service])?;
            }
            Ok(())
        }))
}
