// Copyright (c) 2016 Fedor Gogolev <knsd@knsd.net>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::process::exit;

use sampled::journal::Syslog;
use sampled::{run, Daemonize, Ident};

fn main() {
    let ident = Ident::from_args(std::env::args_os());
    let mut journal = Syslog::open(&ident);

    exit(run(&ident, Daemonize::new(), &mut journal));
}
