mod error;
mod link;
mod session;

use crate::link::XcbLink;

const WIDTH: u16 = 300;
const HEIGHT: u16 = 300;

fn main() {
    env_logger::Builder::new().parse_default_env().init();

    if let Err(err) = session::run(XcbLink::connect, WIDTH, HEIGHT) {
        eprintln!("{err:#}");
        std::process::exit(-1);
    }
}
