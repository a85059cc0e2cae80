use criterion::{black_box, criterion_group, criterion_main, Criterion};
use blockrooms::core::{BagGenerator, Board, Grid, PieceQueue, PieceSets, TopicBus};
use blockrooms::engine::{GameConfig, Registry};
use blockrooms::types::{Command, PieceKind};

fn started_board() -> Board {
    let sets = PieceSets::shared();
    let mut generator = BagGenerator::new(12345);
    for _ in 0..64 {
        sets.borrow_mut().add_set(generator.next_set());
    }
    let mut board = Board::new(1, PieceQueue::new(sets), TopicBus::new());
    board.start().unwrap();
    board
}

fn bench_line_clear(c: &mut Criterion) {
    c.bench_function("clear_4_lines", |b| {
        b.iter(|| {
            let mut grid = Grid::new();
            // Fill bottom 4 rows
            for y in 16..20 {
                for x in 0..10 {
                    grid.set(x, y, Some(PieceKind::I));
                }
            }
            grid.clear_full_rows();
        })
    });
}

fn bench_move(c: &mut Criterion) {
    let mut board = started_board();

    c.bench_function("move_by", |b| {
        b.iter(|| {
            let _ = board.move_by(black_box(1), 0);
            let _ = board.move_by(black_box(-1), 0);
        })
    });
}

fn bench_rotate(c: &mut Criterion) {
    let mut board = started_board();

    c.bench_function("rotate", |b| {
        b.iter(|| {
            board.rotate(black_box(1));
        })
    });
}

fn bench_hard_drop(c: &mut Criterion) {
    c.bench_function("hard_drop_until_top_out", |b| {
        b.iter(|| {
            let mut board = started_board();
            while let Ok(Some(_)) = board.hard_drop() {}
        })
    });
}

fn bench_room_tick(c: &mut Criterion) {
    let mut registry = Registry::new(GameConfig::default());
    let id = registry.create_game("multi").unwrap();
    registry.join_game(&id, 1).unwrap();
    registry.join_game(&id, 2).unwrap();
    registry
        .with_room(&id, |room| {
            room.ready(1, 0).unwrap();
            room.ready(2, 0).unwrap();
        })
        .unwrap();

    let mut now = 0u64;
    c.bench_function("room_tick_16ms", |b| {
        b.iter(|| {
            now += 16;
            registry.advance(black_box(now));
            let _ = registry.with_room(&id, |room| {
                room.execute_commands(1, &[Command::Left, Command::RotateRight], now)
            });
        })
    });
}

criterion_group!(
    benches,
    bench_line_clear,
    bench_move,
    bench_rotate,
    bench_hard_drop,
    bench_room_tick
);
criterion_main!(benches);
