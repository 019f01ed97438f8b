//! Benchmarks for the in-memory handshake and record codec.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rustls_pki_types::PrivateKeyDer;
use tlspal_core::{
    ContextOptions, Credential, CredentialConfig, ProtocolVersion, RustlsCredentialBuilder,
    SecurityContext, StatusCode, TrustSource, decrypt, encrypt, handshake_step,
};

fn credentials() -> (Credential, Credential) {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert = certified.cert.der().clone();
    let key = PrivateKeyDer::Pkcs8(certified.key_pair.serialize_der().into());
    let config = CredentialConfig {
        protocols: vec![ProtocolVersion::Tls13],
        trust: TrustSource::None,
        application_protocols: Vec::new(),
    };
    let client = RustlsCredentialBuilder::new(config.clone())
        .with_trust_anchor(cert.clone())
        .build()
        .unwrap();
    let server = RustlsCredentialBuilder::new(config)
        .with_identity(vec![cert], key)
        .build()
        .unwrap();
    (client, server)
}

/// Ping-pong handshake steps until both sides report `Ok`.
fn connect(client_cred: &Credential, server_cred: &Credential) -> (SecurityContext, SecurityContext) {
    let client_opts = ContextOptions::client("localhost");
    let server_opts = ContextOptions::server();
    let mut client = None;
    let mut server = None;
    let mut out = Vec::new();

    let (_, sent) = handshake_step(client_cred, &mut client, &client_opts, &[], &mut out);
    let mut to_server = sent.bytes(&out).to_vec();
    let mut server_done = false;
    let mut client_done = false;
    while !(server_done && client_done) {
        let (status, sent) =
            handshake_step(server_cred, &mut server, &server_opts, &to_server, &mut out);
        server_done = status.code() == StatusCode::Ok;
        let to_client = sent.bytes(&out).to_vec();

        let (status, sent) =
            handshake_step(client_cred, &mut client, &client_opts, &to_client, &mut out);
        client_done = status.code() == StatusCode::Ok;
        to_server = sent.bytes(&out).to_vec();
    }
    (client.unwrap(), server.unwrap())
}

fn bench_handshake(c: &mut Criterion) {
    let (client_cred, server_cred) = credentials();
    c.bench_function("handshake_tls13", |b| {
        b.iter(|| connect(&client_cred, &server_cred));
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let (client_cred, server_cred) = credentials();
    let (mut client, mut server) = connect(&client_cred, &server_cred);
    let mut group = c.benchmark_group("record_round_trip");

    for size in [64, 1_024, 16_384] {
        let plaintext = vec![0xA5u8; size];
        let mut sealed = Vec::new();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &plaintext, |b, plaintext| {
            b.iter(|| {
                let (_, written) = encrypt(&mut client, plaintext, 0, 0, &mut sealed);
                let len = written.len();
                decrypt(&mut server, &mut sealed, 0, len)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_handshake, bench_round_trip);
criterion_main!(benches);
