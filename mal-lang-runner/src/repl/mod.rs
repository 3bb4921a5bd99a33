mod printer;
mod reader;

use anyhow::{anyhow, Result};
use mal_lang_core::environment::Environment;
use mal_lang_interpreter::{rep, root_environment};
use tracing::info;

use reader::{ReadOutput, Reader};

struct Repl {
    reader: Reader,
    environment: Environment,
}

impl Repl {
    fn run(mut self) {
        loop {
            match self.reader.read() {
                ReadOutput::Exit => break,
                ReadOutput::Clear => continue,
                ReadOutput::Value(line) => printer::print(rep(&line, &mut self.environment)),
            }
        }
    }
}

/// Runs the read-eval-print loop until end of input. Definitions persist
/// across lines, failed ones included.
pub fn start() -> Result<()> {
    let repl = Repl {
        reader: Reader::new()?,
        environment: root_environment().map_err(|err| anyhow!("{err}"))?,
    };
    info!("Starting REPL");
    repl.run();
    Ok(())
}
