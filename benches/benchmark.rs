use benchmark_simple::*;
use jose_jwe::prelude::*;

fn main() {
    let bench = Bench::new();

    let options = &Options {
        iterations: 1000,
        warmup_iterations: 100,
        min_samples: 5,
        max_samples: 10,
        max_rsd: 1.0,
        ..Default::default()
    };

    let plaintext = vec![0x42u8; 1024];

    let sk = JweKey::generate_rsa(2048).unwrap();
    let pk = sk.public_key().unwrap();
    let token = {
        let mut buf = vec![0u8; 8192];
        let mut ctx = JweContext::new(&pk)
            .with_algorithms(KeyManagementAlgorithm::RSA_OAEP, ContentEncryption::A256GCM);
        ctx.encrypt(&plaintext, Scratch::new(&mut buf)).unwrap();
        ctx.to_compact_string().unwrap()
    };
    let pt = plaintext.clone();
    let res = bench.run(options, move || {
        let mut buf = vec![0u8; 8192];
        let mut ctx = JweContext::new(&pk)
            .with_algorithms(KeyManagementAlgorithm::RSA_OAEP, ContentEncryption::A256GCM);
        ctx.encrypt(&pt, Scratch::new(&mut buf)).unwrap();
        ctx.to_compact_string().unwrap()
    });
    println!("rsa-oaep + a256gcm - encrypt: {}", res.throughput(1));

    let res = bench.run(options, move || {
        let mut buf = vec![0u8; 8192];
        let mut ctx = JweContext::new(&sk);
        let scratch = ctx
            .parse_compact(&token, Scratch::new(&mut buf), &DecryptionOptions::default())
            .unwrap();
        ctx.decrypt_and_verify(scratch).unwrap().0.len()
    });
    println!("rsa-oaep + a256gcm - decrypt: {}", res.throughput(1));

    let sk = JweKey::generate_ec(EcCurve::P256);
    let pk = sk.public_key().unwrap();
    let token = {
        let mut buf = vec![0u8; 8192];
        let mut ctx = JweContext::new(&pk)
            .with_algorithms(KeyManagementAlgorithm::ECDH_ES_A128KW, ContentEncryption::A128CBCHS256);
        ctx.encrypt(&plaintext, Scratch::new(&mut buf)).unwrap();
        ctx.to_compact_string().unwrap()
    };
    let res = bench.run(options, move || {
        let mut buf = vec![0u8; 8192];
        let mut ctx = JweContext::new(&pk)
            .with_algorithms(KeyManagementAlgorithm::ECDH_ES_A128KW, ContentEncryption::A128CBCHS256);
        ctx.encrypt(&plaintext, Scratch::new(&mut buf)).unwrap();
        ctx.to_compact_string().unwrap()
    });
    println!("ecdh-es+a128kw + a128cbc-hs256 - encrypt: {}", res.throughput(1));

    let res = bench.run(options, move || {
        let mut buf = vec![0u8; 8192];
        let mut ctx = JweContext::new(&sk);
        let scratch = ctx
            .parse_compact(&token, Scratch::new(&mut buf), &DecryptionOptions::default())
            .unwrap();
        ctx.decrypt_and_verify(scratch).unwrap().0.len()
    });
    println!("ecdh-es+a128kw + a128cbc-hs256 - decrypt: {}", res.throughput(1));
}
