use std::io;

fn main() -> io::Result<()> {
    env_logger::init();
    snesdis::cli::main()
}
