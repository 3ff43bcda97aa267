use std::collections::HashMap;

use interpreter::{Context, PatternSearcher, process_extract};
use xtract::block::Block;
use xtract::parser::parse_arguments;

fn query(args: &[&str]) -> Block {
    let tokens: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    parse_arguments(&tokens, "").expect("query should compile")
}

fn run_with(ctx: &Context, args: &[&str], record: &str) -> String {
    process_extract(record, "", 1, "", "", ctx, &query(args))
}

fn run(args: &[&str], record: &str) -> String {
    run_with(&Context::new(), args, record)
}

fn parse_error(args: &[&str]) -> String {
    let tokens: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    parse_arguments(&tokens, "").unwrap_err().message
}

const STATUSES: &str = "<Set>\
    <Rec><Status>Active</Status><Name>X</Name></Rec>\
    <Rec><Status>Active</Status><Name>Y</Name></Rec>\
    <Rec><Status>Closed</Status><Name>Z</Name></Rec>\
    </Set>";

fn numbered(count: usize) -> String {
    let recs: String = (1..=count)
        .map(|i| format!("<Rec><Id>{}</Id></Rec>", i))
        .collect();
    format!("<Set>{}</Set>", recs)
}

#[test]
fn filters_records_by_condition() {
    assert_eq!(
        run(&["-pattern", "Rec", "-if", "Status", "-equals", "Active", "-element", "Name"], STATUSES),
        "X\tY\n"
    );
}

#[test]
fn group_sums_per_record() {
    let block = query(&["-pattern", "Rec", "-group", "Rec", "-sum", "Score"]);
    let ctx = Context::new();
    let records = [
        "<Rec><Score>3</Score><Score>4</Score></Rec>",
        "<Rec><Score>5</Score><Score>1</Score></Rec>",
        "<Rec><Score>2</Score><Score>2</Score></Rec>",
    ];
    let outputs: Vec<String> = records
        .iter()
        .enumerate()
        .map(|(i, record)| process_extract(record, "Rec", i + 1, "", "", &ctx, &block))
        .collect();
    assert_eq!(outputs, vec!["7\n", "6\n", "4\n"]);
}

#[test]
fn overflowing_sums_fall_back_to_the_default() {
    let record = "<Rec><Score>9223372036854775807</Score><Score>1</Score></Rec>";
    assert_eq!(run(&["-pattern", "Rec", "-sum", "Score"], record), "");
    assert_eq!(
        run(&["-pattern", "Rec", "-def", "-", "-sum", "Score", "-inc", "Score"], record),
        "-\t2\n"
    );
}

#[test]
fn first_position_keeps_one_match() {
    assert_eq!(
        run(&["-pattern", "Rec", "-position", "first", "-element", "Id"], &numbered(5)),
        "1\n"
    );
}

#[test]
fn range_boundaries() {
    assert!(parse_arguments(
        &["-pattern", "Rec", "-element", "Name[1:]"].map(String::from),
        ""
    )
    .is_ok());
    assert!(parse_error(&["-pattern", "Rec", "-element", "Name[:0]"]).contains("must not be zero"));
}

#[test]
fn position_policies() {
    let doc = numbered(5);
    let ids = |position: &str| run(&["-pattern", "Rec", "-position", position, "-element", "Id"], &doc);
    assert_eq!(ids("last"), "5\n");
    assert_eq!(ids("outer"), "1\t5\n");
    assert_eq!(ids("inner"), "2\t3\t4\n");
    assert_eq!(ids("even"), "2\t4\n");
    assert_eq!(ids("odd"), "1\t3\t5\n");
    assert_eq!(ids("3"), "3\n");
    assert_eq!(ids("all"), "1\t2\t3\t4\t5\n");
    assert_eq!(run(&["-pattern", "Rec", "-position", "inner", "-element", "Id"], &numbered(2)), "");
}

#[test]
fn else_branch_runs_when_conditions_fail() {
    assert_eq!(
        run(
            &["-pattern", "Rec", "-if", "Status", "-equals", "Active", "-element", "Name", "-else", "-lbl", "inactive"],
            STATUSES
        ),
        "X\tY\tinactive\n"
    );
    assert_eq!(
        run(&["-pattern", "Rec", "-unless", "Status", "-equals", "Active", "-element", "Name"], STATUSES),
        "Z\n"
    );
}

#[test]
fn variables_flow_into_nested_blocks() {
    let record = "<Rec><Id>1</Id><Author><Last>Smith</Last></Author>\
        <Author><Last>Jones</Last></Author></Rec>";
    assert_eq!(
        run(
            &["-pattern", "Rec", "-PMID", "Id", "-block", "Author", "-sep", "|", "-element", "&PMID,Last"],
            record
        ),
        "1|Smith\t1|Jones\n"
    );
    assert_eq!(
        run(&["-pattern", "Rec", "-element", "#Author", "-block", "Author", "-position", "last", "-element", "+"], record),
        "2\t2\n"
    );
}

#[test]
fn foreword_and_afterword_surround_the_block() {
    assert_eq!(
        run(&["-pattern", "Rec", "-fwd", "<ids>", "-awd", "</ids>", "-element", "Id"], &numbered(3)),
        "<ids>1\t2\t3</ids>\n"
    );
}

#[test]
fn select_passes_source_through() {
    assert_eq!(
        run(&["-pattern", "Rec", "-position", "select"], "<Rec><Id a=\"1\">x</Id></Rec>"),
        "<Rec><Id a=\"1\">x</Id></Rec>\n"
    );
}

#[test]
fn select_honors_block_conditions() {
    let doc = "<Set><Rec><Status>Active</Status></Rec><Rec><Status>Closed</Status></Rec></Set>";
    assert_eq!(
        run(
            &["-pattern", "Set", "-block", "Rec", "-position", "select", "-if", "Status", "-equals", "Active"],
            doc
        ),
        "<Rec><Status>Active</Status></Rec>\n"
    );
}

#[test]
fn structural_dumps() {
    let record = "<Rec><Id>1</Id><Tag>a</Tag></Rec>";
    assert_eq!(run(&["-pattern", "Rec", "-element", "."], record), "Rec[Id[1] Tag[a]]\n");
    assert_eq!(run(&["-pattern", "Rec", "-element", "%"], record), "{\"Rec\":{\"Id\":\"1\",\"Tag\":\"a\"}}\n");
    assert_eq!(run(&["-pattern", "Rec", "-element", "**"], record), "<Rec><Id>1</Id><Tag>a</Tag></Rec>\n");
    assert_eq!(
        run(&["-pattern", "Rec", "-element", "*"], "<Rec><T>a &amp; b &lt; c</T></Rec>"),
        "<Rec><T>a &amp; b &lt; c</T></Rec>\n"
    );
}

#[test]
fn record_terminator_follows_last_ret() {
    assert_eq!(
        run(&["-pattern", "Rec", "-ret", "\\n\\n", "-element", "Id"], &numbered(2)),
        "1\t2\n\n"
    );
}

#[test]
fn empty_records_produce_nothing() {
    assert_eq!(run(&["-pattern", "Rec", "-element", "Missing"], &numbered(2)), "");
    assert_eq!(run(&["-pattern", "Rec", "-element", "Id"], "<Rec><Id>1</Rec>"), "");
}

#[test]
fn classification_uses_the_searcher() {
    let searcher = PatternSearcher::new([("cobra", "SNAKE"), ("krait", "SNAKE"), ("viper", "SNAKE")])
        .expect("patterns should compile");
    let ctx = Context::new().with_searcher(Box::new(searcher));
    assert_eq!(
        run_with(
            &ctx,
            &["-pattern", "Rec", "-classify", "Text"],
            "<Rec><Text>Cobra and krait bites; a second cobra</Text></Rec>"
        ),
        "<SNAKE>cobra</SNAKE>\t<SNAKE>krait</SNAKE>\n"
    );
}

#[test]
fn meshcodes_come_from_the_translation_table() {
    let table = HashMap::from([
        ("Venoms".to_string(), "D20.888, D14.123".to_string()),
        ("Snakes".to_string(), "B01.050".to_string()),
    ]);
    let ctx = Context::new().with_translation(table);
    assert_eq!(
        run_with(
            &ctx,
            &["-pattern", "Rec", "-meshcode", "Mesh"],
            "<Rec><Mesh>Venoms</Mesh><Mesh>Snakes</Mesh><Mesh>Other</Mesh></Rec>"
        ),
        "B01.050\tD14.123\tD20.888\n"
    );
}

#[test]
fn nucleic_reverse_complements_inverted_ranges() {
    let record = "<Rec><Seq>ACGTTGCA</Seq></Rec>";
    assert_eq!(run(&["-pattern", "Rec", "-nucleic", "Seq[2:5]"], record), "CGTT\n");
    assert_eq!(run(&["-pattern", "Rec", "-nucleic", "Seq[5:2]"], record), "AACG\n");
    assert_eq!(run(&["-pattern", "Rec", "-element", "Seq[5:2]"], record), "");
}

#[test]
fn shared_caches_across_threads() {
    let block = query(&["-pattern", "Rec", "-histogram", "Kind", "-reg", "o+", "-exp", "0", "-replace", "Kind"]);
    let ctx = Context::new();
    let outputs: Vec<Vec<String>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let block = &block;
                let ctx = &ctx;
                scope.spawn(move || {
                    (0..25)
                        .map(|i| {
                            let kind = if i % 2 == 0 { "foo" } else { "boo" };
                            let record = format!("<Rec><Kind>{}</Kind></Rec>", kind);
                            process_extract(&record, "Rec", worker * 25 + i, "", "", ctx, block)
                        })
                        .collect::<Vec<String>>()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(outputs.iter().flatten().all(|out| out == "f0\n" || out == "b0\n"));
    assert_eq!(
        ctx.histogram.snapshot(),
        vec![("boo".to_string(), 48), ("foo".to_string(), 52)]
    );
    assert_eq!(ctx.regexes.len(), 1);
}

#[test]
fn grammar_errors_are_reported() {
    assert!(parse_error(&["-pattern", "Rec", "-bogus", "Id"]).contains("unrecognized argument '-bogus'"));
    assert!(parse_error(&["-pattern", "Rec", "-if", "Id"]).contains("no extraction command"));
    assert!(parse_error(&["-pattern", "Rec", "-pattern", "Rec", "-element", "Id"]).contains("only one -pattern"));
    assert!(parse_error(&["-pattern", "Rec", "-element", "Id", "-else", "-element", "Id"]).contains("-else"));
}
