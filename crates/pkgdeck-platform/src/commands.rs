#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub trait HideWindow {
    fn hide_window(&mut self) -> &mut Self;
}

impl HideWindow for tokio::process::Command {
    #[cfg(windows)]
    fn hide_window(&mut self) -> &mut Self {
        self.creation_flags(CREATE_NO_WINDOW)
    }

    #[cfg(not(windows))]
    fn hide_window(&mut self) -> &mut Self {
        self
    }
}

/// Build a command that runs `command_line` through the platform shell
/// (`cmd /C` on Windows, `sh -c` elsewhere) without opening a console window.
///
/// On Windows the line is passed to `cmd` verbatim: `cmd` does its own
/// parsing and does not understand `\"` escapes.
#[must_use]
pub fn shell_command(command_line: &str) -> tokio::process::Command {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = tokio::process::Command::new("cmd");
        cmd.arg("/C").raw_arg(command_line);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    };

    cmd.hide_window();
    cmd
}

#[cfg(test)]
mod tests {
    use super::{HideWindow, shell_command};

    #[test]
    fn tokio_command_hide_window_is_chainable() {
        let mut cmd = tokio::process::Command::new("echo");
        let before = &raw mut cmd;
        let after = cmd.hide_window() as *mut tokio::process::Command;
        assert_eq!(before, after);
    }

    #[test]
    fn shell_command_wraps_line_in_platform_shell() {
        let cmd = shell_command("echo hello");
        let std_cmd = cmd.as_std();
        let args: Vec<_> = std_cmd.get_args().collect();

        #[cfg(windows)]
        {
            assert_eq!(std_cmd.get_program(), "cmd");
            assert_eq!(args, ["/C", "echo hello"]);
        }

        #[cfg(not(windows))]
        {
            assert_eq!(std_cmd.get_program(), "sh");
            assert_eq!(args, ["-c", "echo hello"]);
        }
    }

    #[cfg(windows)]
    #[test]
    fn quoted_arguments_reach_cmd_verbatim() {
        let line = r#"choco install "my pkg" -y"#;
        let cmd = shell_command(line);
        let args: Vec<_> = cmd.as_std().get_args().collect();

        assert_eq!(args, ["/C", line]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn quoted_arguments_survive_the_shell() {
        let output = shell_command(r#"printf '%s|' "my pkg" -y"#)
            .output()
            .await
            .expect("shell should run");

        assert_eq!(String::from_utf8_lossy(&output.stdout), "my pkg|-y|");
    }
}
