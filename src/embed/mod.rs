//! Embedded static resources.

/// Variables for the viewer page template.
pub struct ViewerVars {
    pub ws_port: u16,
}

const VIEWER_HTML: &str = include_str!("index.html");

/// Render the viewer page with its WebSocket port substituted in.
pub fn render_viewer(vars: &ViewerVars) -> String {
    VIEWER_HTML.replace("__WS_PORT__", &vars.ws_port.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_port_substitution() {
        let html = render_viewer(&ViewerVars { ws_port: 35729 });
        assert!(html.contains("35729"));
        assert!(!html.contains("__WS_PORT__"));
    }
}
