//! Payload templates embedded at compile time.

use include_dir::{include_dir, Dir};

use crate::config::{render_template, Variables};
use crate::error::{ProvisorError, Result};

/// Embedded templates directory.
static TEMPLATES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Raw content of an embedded template.
pub fn template(name: &str) -> Result<&'static str> {
    let file = TEMPLATES_DIR
        .get_file(name)
        .ok_or_else(|| ProvisorError::ConfigNotFound {
            path: format!("templates/{}", name).into(),
        })?;

    file.contents_utf8()
        .ok_or_else(|| ProvisorError::ConfigParseError {
            path: format!("templates/{}", name).into(),
            message: "Invalid UTF-8".to_string(),
        })
}

/// Render an embedded template with `vars`.
pub fn render(name: &str, vars: &Variables) -> Result<String> {
    render_template(template(name)?, vars)
}

/// Names of all embedded templates, sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = TEMPLATES_DIR
        .files()
        .filter_map(|f| f.path().to_str())
        .collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::extract_variables;

    #[test]
    fn all_templates_are_embedded() {
        assert_eq!(
            names(),
            vec![
                "Makefile",
                "dhcpcd.conf",
                "dnsmasq.conf",
                "go.sh",
                "hostapd.conf",
                "learnlab.service",
            ]
        );
    }

    #[test]
    fn unknown_template_is_not_found() {
        let err = template("nginx.conf").unwrap_err();
        assert!(matches!(err, ProvisorError::ConfigNotFound { .. }));
    }

    #[test]
    fn makefile_keeps_tabs_and_make_variables() {
        let makefile = render("Makefile", &Variables::new()).unwrap();
        assert!(makefile.contains("\n\t@psql $$DATABASE_URL -f migrations/001_init.sql\n"));
        for target in ["help:", "generate:", "build:", "migrate:", "deps:", "clean:"] {
            assert!(makefile.lines().any(|l| l == target), "missing {target}");
        }
    }

    #[test]
    fn unit_template_variables() {
        let vars: Vec<_> = extract_variables(template("learnlab.service").unwrap())
            .into_iter()
            .collect();
        assert_eq!(vars, vec!["backend_dir", "service", "service_user"]);
    }

    #[test]
    fn go_profile_keeps_shell_path() {
        assert_eq!(
            render("go.sh", &Variables::new()).unwrap(),
            "export PATH=$PATH:/usr/local/go/bin\n"
        );
    }
}
