use clap::Parser;
use serialtalker::cli::args::{Args, Command, ConfigCommand, DataFormat, OutputFormat, ParityArg};
use serialtalker::cli::commands::{interpret, parse_data, TerminalInput};
use serialtalker::DisplayMode;

/// CLI interface tests
#[cfg(test)]
mod cli_tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv.iter().copied()).unwrap_or_else(|e| panic!("failed to parse {:?}: {}", argv, e))
    }

    #[test]
    fn test_cli_help_lists_commands() {
        let err = Args::try_parse_from(["serialtalker", "--help"]).unwrap_err();
        let help = err.to_string();

        assert!(help.contains("Usage:"));
        for command in ["ports", "negotiate", "send", "connect", "config", "version"] {
            assert!(help.contains(command), "help is missing '{}'", command);
        }
    }

    #[test]
    fn test_global_flags() {
        let args = parse(&["serialtalker", "ports", "-v", "--output", "json", "--config", "/tmp/st.toml"]);

        assert!(args.verbose);
        assert!(!args.quiet);
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.config.as_deref(), Some("/tmp/st.toml"));
        assert!(matches!(args.command, Command::Ports));
    }

    #[test]
    fn test_negotiate_arguments() {
        let args = parse(&[
            "serialtalker", "negotiate", "--port", "/dev/ttyUSB0", "--data-bits", "7", "--parity", "even",
        ]);

        match args.command {
            Command::Negotiate { port, framing } => {
                assert_eq!(port, "/dev/ttyUSB0");
                assert_eq!(framing.data_bits, Some(7));
                assert_eq!(framing.stop_bits, None);
                assert_eq!(framing.parity, Some(ParityArg::Even));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_send_arguments() {
        let args = parse(&["serialtalker", "send", "-p", "COM3", "-b", "115200", "-f", "hex", "41 54 0D 0A"]);

        match args.command {
            Command::Send { port, baud, data, format, wait, .. } => {
                assert_eq!(port, "COM3");
                assert_eq!(baud, Some(115200));
                assert_eq!(format, DataFormat::Hex);
                assert_eq!(wait, 500);
                assert_eq!(parse_data(&data, format).unwrap(), b"AT\r\n".to_vec());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_connect_arguments() {
        let args = parse(&["serialtalker", "connect", "--auto", "--display", "hex-ascii"]);

        match args.command {
            Command::Connect { port, baud, auto, display, .. } => {
                assert_eq!(port, None);
                assert_eq!(baud, None);
                assert!(auto);
                assert_eq!(display.map(DisplayMode::from), Some(DisplayMode::HexAndAscii));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_connect_rejects_baud_with_auto() {
        let result = Args::try_parse_from(["serialtalker", "connect", "--auto", "--baud", "9600"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_subcommands() {
        for (name, expected) in [("show", "Show"), ("init", "Init"), ("path", "Path")] {
            let args = parse(&["serialtalker", "config", name]);
            match args.command {
                Command::Config(config) => {
                    let parsed = match config.command {
                        ConfigCommand::Show => "Show",
                        ConfigCommand::Init => "Init",
                        ConfigCommand::Path => "Path",
                    };
                    assert_eq!(parsed, expected);
                }
                other => panic!("unexpected command {:?}", other),
            }
        }
    }

    #[test]
    fn test_unknown_command_fails() {
        assert!(Args::try_parse_from(["serialtalker", "tcp"]).is_err());
        assert!(Args::try_parse_from(["serialtalker", "send", "--port", "COM1"]).is_err());
    }

    #[test]
    fn test_terminal_input_commands() {
        assert_eq!(interpret(":mode ascii"), TerminalInput::Mode(DisplayMode::Ascii));
        assert_eq!(interpret("AT+RST"), TerminalInput::Send("AT+RST".to_string()));
        assert_eq!(interpret(":quit"), TerminalInput::Quit);
    }
}
