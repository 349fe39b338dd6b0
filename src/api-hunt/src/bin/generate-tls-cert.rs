use rcgen::generate_simple_self_signed;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

const DEFAULT_SANS: [&str; 3] = ["localhost", "127.0.0.1", "0.0.0.0"];

/// Writes a self-signed certificate for local HTTPS to `<dir>/cert.pem` and `<dir>/key.pem`.
/// Usage: generate-tls-cert [output_directory] [subject_alt_name...]
fn main() {
    let mut args = env::args().skip(1);
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "certs".to_string()));
    let mut subject_alt_names: Vec<String> = args.collect();
    if subject_alt_names.is_empty() {
        subject_alt_names = DEFAULT_SANS.iter().map(|s| s.to_string()).collect();
    }

    if let Err(e) = fs::create_dir_all(&output_dir) {
        eprintln!("Error creating {}: {}", output_dir.display(), e);
        process::exit(1);
    }

    eprintln!("Generating self-signed certificate for {:?}", subject_alt_names);
    let cert = generate_simple_self_signed(subject_alt_names).unwrap_or_else(|e| {
        eprintln!("Error generating certificate: {}", e);
        process::exit(1);
    });

    let cert_path = output_dir.join("cert.pem");
    let key_path = output_dir.join("key.pem");
    for (path, pem) in [(&cert_path, cert.cert.pem()), (&key_path, cert.key_pair.serialize_pem())] {
        if let Err(e) = fs::write(path, pem) {
            eprintln!("Error writing {}: {}", path.display(), e);
            process::exit(1);
        }
    }

    eprintln!("Add these lines to your .env file to serve the API over HTTPS:");
    println!("ENABLE_TLS=true");
    println!("TLS_CERT_PATH={}", cert_path.display());
    println!("TLS_KEY_PATH={}", key_path.display());
}
