use retinoscan::{Report, SourceKind, TractResult};

fn main() -> TractResult<()> {
    let mut args = std::env::args().skip(1);
    let (Some(model_path), Some(image_path)) = (args.next(), args.next()) else {
        eprintln!("usage: run <model.onnx> <fundus-image>");
        std::process::exit(2);
    };

    let classifier = retinoscan::Classifier::from_path(model_path)?;

    let img = retinoscan::image::open(image_path)?;
    let prediction = classifier.classify_dynamic(&img)?;
    print!("{}", Report::new(&prediction, SourceKind::Image));
    Ok(())
}
