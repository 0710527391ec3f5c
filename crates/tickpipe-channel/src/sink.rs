/// Destination for inbound commands.
///
/// The manager hands over each command exactly once, with CR/LF trimmed and
/// never empty. Closures taking `&str` implement this directly.
pub trait CommandSink {
    fn handle_command(&mut self, command: &str);
}

impl<F> CommandSink for F
where
    F: FnMut(&str),
{
    fn handle_command(&mut self, command: &str) {
        self(command)
    }
}

/// Collects commands in arrival order.
impl CommandSink for Vec<String> {
    fn handle_command(&mut self, command: &str) {
        self.push(command.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deliver<S: CommandSink + ?Sized>(sink: &mut S, commands: &[&str]) {
        for command in commands {
            sink.handle_command(command);
        }
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        let mut sink = |command: &str| seen.push(command.len());
        deliver(&mut sink, &["foo", "end_turn"]);
        assert_eq!(seen, vec![3, 8]);
    }

    #[test]
    fn vec_collects_in_order() {
        let mut sink: Vec<String> = Vec::new();
        deliver(&mut sink, &["a", "b"]);
        assert_eq!(sink, vec!["a", "b"]);
    }
}
