use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ulaw_rtp_sender::codec::{ulaw, UlawEncoder};
use ulaw_rtp_sender::protocol::{NtpTimestamp, RtpHeader, RtpPacket, SenderReport};

fn sine_block(len: usize) -> Vec<i16> {
    (0..len)
        .map(|i| ((i as f32 * 2.0 * std::f32::consts::PI / 8.0).sin() * 12_000.0) as i16)
        .collect()
}

fn bench_encode_block(c: &mut Criterion) {
    let block = sine_block(160);
    let mut out = BytesMut::with_capacity(160);

    c.bench_function("ulaw_encode_block_160", |b| {
        b.iter(|| {
            out.clear();
            ulaw::encode_block(black_box(&block), &mut out);
            black_box(&out);
        })
    });

    c.bench_function("ulaw_encode_full_range", |b| {
        b.iter(|| {
            let mut acc = 0u32;
            for s in i16::MIN..=i16::MAX {
                acc = acc.wrapping_add(u32::from(ulaw::encode(black_box(s))));
            }
            acc
        })
    });
}

fn bench_packetize(c: &mut Criterion) {
    let block = sine_block(160);
    let mut encoder = UlawEncoder::new(160);
    let mut seq = 0u16;

    c.bench_function("rtp_packetize_160", |b| {
        b.iter(|| {
            let payload = encoder.encode(black_box(&block));
            let packet = RtpPacket::new(RtpHeader::new(seq, u32::from(seq) * 160, 0xDEADBEEF), payload);
            seq = seq.wrapping_add(1);
            black_box(packet.encode())
        })
    });

    let report = SenderReport::new(0xDEADBEEF, NtpTimestamp::from_unix(1_700_000_000, 0), 8000, 50, 8000);
    c.bench_function("rtcp_sender_report", |b| b.iter(|| black_box(black_box(&report).to_bytes())));
}

criterion_group!(benches, bench_encode_block, bench_packetize);
criterion_main!(benches);
