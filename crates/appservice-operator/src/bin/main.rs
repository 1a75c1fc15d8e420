use clap::Parser;

fn main() {
    fluvio_future::subscriber::init_tracer(None);

    let opt = appservice_operator::cli::OperatorOpt::parse();
    appservice_operator::start::main_loop(opt);
}
