//! colexpr - runs a partitioned aggregation through the expression compiler

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser as ClapParser;
use colexpr::aggregation::AggregationParameters;
use colexpr::block::BlockBuilder;
use colexpr::codegen::{CompiledAggregation, CompiledExpression, ExpressionCompiler};
use colexpr::config::CompilerConfig;
use colexpr::expression::RowExpression;
use colexpr::function::FunctionRegistry;
use colexpr::operator::{
    collect_pages, AggregationStep, FilterAndProjectOperator, HashAggregationOperator,
    ValuesOperator, OUTPUT_PAGE_ROWS,
};
use colexpr::page::{Page, RowLayout};
use colexpr::session::Session;
use colexpr::signature::Signature;
use colexpr::types::{Type, Value};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Instant;

/// colexpr - compile expressions and aggregate random partitioned data
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Rows generated per partition
    #[arg(short, long, default_value = "100000")]
    rows: usize,

    /// Number of partitions, each aggregated on its own thread
    #[arg(short, long, default_value = "4")]
    partitions: usize,

    /// Fraction of generated values that are NULL
    #[arg(short, long, default_value = "0.05")]
    null_ratio: f64,

    /// Random seed
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Confidence for approx_count bounds
    #[arg(short, long, default_value = "0.95")]
    confidence: f64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Generated input: (region varchar, quantity bigint, price double)
fn input_layout() -> RowLayout {
    RowLayout::new(vec![Type::Varchar, Type::Bigint, Type::Double])
}

const REGIONS: [&str; 5] = ["africa", "america", "asia", "europe", "middle east"];

fn generate_partition(rng: &mut StdRng, rows: usize, null_ratio: f64) -> Result<Vec<Page>> {
    let mut pages = Vec::new();
    let mut remaining = rows;
    while remaining > 0 {
        let count = remaining.min(OUTPUT_PAGE_ROWS);
        let mut regions = BlockBuilder::with_capacity(Type::Varchar, count);
        let mut quantities = BlockBuilder::with_capacity(Type::Bigint, count);
        let mut prices = BlockBuilder::with_capacity(Type::Double, count);
        for _ in 0..count {
            let region = REGIONS[rng.gen_range(0..REGIONS.len())];
            regions.append_slice(region.as_bytes())?;
            if rng.gen_bool(null_ratio) {
                quantities.append_null();
            } else {
                quantities.append_long(rng.gen_range(1..=50))?;
            }
            if rng.gen_bool(null_ratio) {
                prices.append_null();
            } else {
                prices.append_double(rng.gen_range(1.0..1000.0))?;
            }
        }
        pages.push(Page::new(vec![
            regions.build(),
            quantities.build(),
            prices.build(),
        ])?);
        remaining -= count;
    }
    Ok(pages)
}

/// WHERE quantity > 5
fn filter_expression() -> RowExpression {
    RowExpression::call(
        Signature::new(
            "greater_than",
            Type::Boolean,
            vec![Type::Bigint, Type::Bigint],
        ),
        vec![RowExpression::input(1, Type::Bigint), RowExpression::bigint(5)],
    )
}

/// SELECT upper(region), quantity, quantity * price
fn projection_expressions() -> Vec<RowExpression> {
    vec![
        RowExpression::call(
            Signature::new("upper", Type::Varchar, vec![Type::Varchar]),
            vec![RowExpression::input(0, Type::Varchar)],
        ),
        RowExpression::input(1, Type::Bigint),
        RowExpression::call(
            Signature::new("multiply", Type::Double, vec![Type::Double, Type::Double]),
            vec![
                RowExpression::call(
                    Signature::new("cast", Type::Double, vec![Type::Bigint]),
                    vec![RowExpression::input(1, Type::Bigint)],
                ),
                RowExpression::input(2, Type::Double),
            ],
        ),
    ]
}

/// Aggregations over the projected layout
fn aggregation_expressions() -> Vec<RowExpression> {
    let aggregate = |name: &str, return_type: Type, channel: usize, input_type: Type| {
        RowExpression::call(
            Signature::new(name, return_type, vec![input_type]),
            vec![RowExpression::input(channel, input_type)],
        )
    };
    vec![
        aggregate("count", Type::Bigint, 1, Type::Bigint),
        aggregate("sum", Type::Bigint, 1, Type::Bigint),
        aggregate("avg", Type::Double, 2, Type::Double),
        aggregate("max", Type::Double, 2, Type::Double),
        aggregate("approx_count", Type::Varchar, 2, Type::Double),
    ]
}

struct CompiledPlan {
    filter: CompiledExpression,
    projections: Vec<CompiledExpression>,
    aggregations: Vec<CompiledAggregation>,
}

fn compile_plan(compiler: &ExpressionCompiler) -> Result<CompiledPlan> {
    let layout = input_layout();
    let filter = compiler
        .compile_filter(&filter_expression(), &layout)
        .context("Failed to compile filter")?;
    let projections = projection_expressions()
        .iter()
        .map(|expr| compiler.compile(expr, &layout))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to compile projections")?;

    let projected = RowLayout::new(projections.iter().map(|p| p.output_type()).collect());
    let aggregations = aggregation_expressions()
        .iter()
        .map(|expr| compiler.compile_aggregation(expr, &projected))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to compile aggregations")?;

    Ok(CompiledPlan {
        filter,
        projections,
        aggregations,
    })
}

fn run_partial(
    compiler: &ExpressionCompiler,
    session: Arc<Session>,
    pages: Vec<Page>,
) -> Result<Vec<Page>> {
    let plan = compile_plan(compiler)?;
    let scan = ValuesOperator::new(input_layout(), pages)?;
    let project = FilterAndProjectOperator::new(
        Box::new(scan),
        session.clone(),
        Some(plan.filter),
        plan.projections,
    );
    let mut partial = HashAggregationOperator::new(
        Box::new(project),
        session,
        AggregationStep::Partial,
        vec![0],
        plan.aggregations,
    )?;
    collect_pages(&mut partial)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if !(0.0..=1.0).contains(&args.null_ratio) {
        bail!("Null ratio must be between 0 and 1, got {}", args.null_ratio);
    }

    let parameters = AggregationParameters::with_confidence(args.confidence);
    let functions = FunctionRegistry::new()
        .with_aggregation_parameters(parameters)
        .context("Invalid aggregation parameters")?;
    let compiler = ExpressionCompiler::new(Arc::new(functions), CompilerConfig::default());
    let session = Arc::new(Session::new("colexpr"));

    info!(
        "Generating {} partitions of {} rows (seed {}, null ratio {})",
        args.partitions, args.rows, args.seed, args.null_ratio
    );
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut partitions = Vec::with_capacity(args.partitions);
    for _ in 0..args.partitions {
        partitions.push(generate_partition(&mut rng, args.rows, args.null_ratio)?);
    }

    let started = Instant::now();
    let partial_pages = std::thread::scope(|scope| -> Result<Vec<Page>> {
        let handles: Vec<_> = partitions
            .into_iter()
            .enumerate()
            .map(|(index, pages)| {
                let compiler = &compiler;
                let session = session.clone();
                scope.spawn(move || {
                    debug!("Partition {} aggregating {} pages", index, pages.len());
                    run_partial(compiler, session, pages)
                })
            })
            .collect();

        let mut states = Vec::new();
        for handle in handles {
            let pages = handle
                .join()
                .map_err(|_| anyhow!("Partial aggregation worker panicked"))??;
            states.extend(pages);
        }
        Ok(states)
    })?;

    let plan = compile_plan(&compiler)?;
    let mut state_layout = vec![Type::Varchar];
    state_layout.extend(plan.aggregations.iter().map(|_| Type::Varbinary));
    let exchange = ValuesOperator::new(RowLayout::new(state_layout), partial_pages)?;
    let mut final_step = HashAggregationOperator::new(
        Box::new(exchange),
        session.clone(),
        AggregationStep::Final,
        vec![0],
        plan.aggregations,
    )?;
    let results = collect_pages(&mut final_step)?;
    let elapsed = started.elapsed();

    let names: Vec<String> = aggregation_expressions()
        .iter()
        .filter_map(|expr| match expr {
            RowExpression::Call { signature, .. } => Some(signature.to_string()),
            _ => None,
        })
        .collect();
    info!("region | {}", names.join(" | "));
    for page in &results {
        for position in 0..page.position_count() {
            let row = page.row(&session, position)?;
            let cells: Vec<String> = row.iter().map(Value::to_string).collect();
            info!("{}", cells.join(" | "));
        }
    }

    info!(
        "Aggregated {} rows in {:?}; {} compiled expressions cached, {} call sites bound after {} lookups",
        args.rows * args.partitions,
        elapsed,
        compiler.cached_expressions(),
        compiler.binder().bound_call_sites(),
        compiler.binder().lookup_count()
    );

    Ok(())
}
