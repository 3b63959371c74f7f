use std::io;

use crate::prod_server_helpers::validate_display_name;


pub fn run(display_name: &str) -> io::Result<()> {
    match validate_display_name(display_name) {
        Ok(_) => {
            println!("OK");
            Ok(())
        }
        Err(err) => {
            eprintln!("Invalid display name {:?}: {}", display_name, err);
            Err(io::Error::from(io::ErrorKind::InvalidData))
        }
    }
}
