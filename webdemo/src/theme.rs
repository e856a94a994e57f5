/// Look of the analysis page. Both variants share one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub title: &'static str,
    pub heading: &'static str,
    /// Class on the page root, selects the palette in `style.css`.
    pub class: &'static str,
    pub sidebar: bool,
}

impl Theme {
    pub const PORTAL: Theme = Theme {
        name: "portal",
        title: "👁️ RetinoScan AI",
        heading: "Diagnostic Portal",
        class: "theme-portal",
        sidebar: true,
    };

    pub const CLINIC: Theme = Theme {
        name: "clinic",
        title: "RetinoScan AI",
        heading: "Retina Screening",
        class: "theme-clinic",
        sidebar: false,
    };

    pub const ALL: [Theme; 2] = [Theme::PORTAL, Theme::CLINIC];

    /// Picks the theme named by `?theme=` in a location search string.
    pub fn from_query(search: &str) -> Theme {
        search
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "theme")
            .and_then(|(_, value)| Theme::ALL.into_iter().find(|t| t.name == value))
            .unwrap_or(Theme::PORTAL)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::PORTAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_comes_from_the_query_string() {
        assert_eq!(Theme::from_query("?theme=clinic"), Theme::CLINIC);
        assert_eq!(Theme::from_query("?lang=en&theme=portal"), Theme::PORTAL);
        assert_eq!(Theme::from_query(""), Theme::PORTAL);
        assert_eq!(Theme::from_query("?theme=neon"), Theme::PORTAL);
    }
}
