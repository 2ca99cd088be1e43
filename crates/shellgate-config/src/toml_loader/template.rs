//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r##"# Shellgate Configuration
# Only override what you want to change -- missing fields use defaults.

[terminal]
# shell = "bash"            # name or path, resolved through PATH
# args = []
# working_directory = "/home/you"
# port = 3000               # base port; extra tabs use port+2 .. port+5

[terminal.env]
# EDITOR = "nvim"

[server]
# bind_address = "127.0.0.1"
# path = "/webterminal"
# shutdown_grace_ms = 5000  # 100-60000

[logging]
# level = "info"            # trace, debug, info, warn, error
"##
}
