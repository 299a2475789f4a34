use text_search::{
    Error, GlobalWeighting, InvertedFile, LocalWeighting, Selection, SharedIndex, TextConfig, Tokenizer, VectorModel,
    Vocabulary,
};

const CORPUS: [&str; 3] = ["the cat sat", "the dog ran", "cat and cat again"];

fn model() -> (Tokenizer, VectorModel) {
    let tokenizer = Tokenizer::new(TextConfig::unigrams());
    let voc = Vocabulary::from_texts(&tokenizer, &CORPUS).unwrap();
    let model = VectorModel::fit(GlobalWeighting::idf(), LocalWeighting::Tf, voc).unwrap();
    (tokenizer, model)
}

fn index() -> (Tokenizer, InvertedFile) {
    let (tokenizer, model) = model();
    let vectors = model.vectorize_corpus(&tokenizer, &CORPUS).unwrap();
    let mut index = InvertedFile::with_model(model);
    assert_eq!(index.extend(&vectors).unwrap(), 0..3);
    (tokenizer, index)
}

#[test]
fn search_text_ranks_documents() {
    let (mut tokenizer, index) = index();
    let hits = index.search_text(&mut tokenizer, "cat", 2).unwrap();
    assert_eq!(hits.doc_ids(), vec![2, 0]);
    assert!(hits.list[0].score > hits.list[1].score);

    let hits = index.search_text(&mut tokenizer, "Dog", 10).unwrap();
    assert_eq!(hits.doc_ids(), vec![1]);
}

#[test]
fn cat_dog_bird() {
    let corpus = ["cat dog", "dog bird", "cat cat bird"];
    let mut tokenizer = Tokenizer::new(TextConfig::unigrams());
    let voc = Vocabulary::from_texts(&tokenizer, &corpus).unwrap();
    assert_eq!(voc.id_of("cat"), Some(0));
    assert_eq!(voc.id_of("dog"), Some(1));
    assert_eq!(voc.id_of("bird"), Some(2));

    let model = VectorModel::fit(GlobalWeighting::idf(), LocalWeighting::Tf, voc).unwrap();
    let vectors = model.vectorize_corpus(&tokenizer, &corpus).unwrap();
    let query = model.vectorize_text(&mut tokenizer, "cat").unwrap();
    let mut index = InvertedFile::with_model(model);
    index.extend(&vectors).unwrap();

    let hits = index.search(&query, 2);
    assert_eq!(hits.doc_ids(), vec![2, 0]);
    assert!(hits.list[0].score >= hits.list[1].score);
    assert!(!hits.doc_ids().contains(&1));
}

#[test]
fn vocabulary_statistics() {
    let (_, model) = model();
    let voc = model.vocabulary();
    assert_eq!(voc.corpus_size(), 3);
    assert_eq!(voc.len(), 7);
    assert_eq!(voc.id_of("the"), Some(0));
    assert_eq!(voc.id_of("cat"), Some(1));
    let cat = voc.id_of("cat").unwrap();
    assert_eq!(voc.ndocs(cat), 2);
    assert_eq!(voc.collection_freq(cat), 3);
    assert!(model.global_weight(cat) < model.global_weight(voc.id_of("dog").unwrap()));
}

#[test]
fn out_of_vocabulary_text_gives_an_empty_vector() {
    let (mut tokenizer, model) = model();
    let vec = model.vectorize_text(&mut tokenizer, "zebra unicorn").unwrap();
    assert!(vec.is_empty());

    let (mut tokenizer, index) = index();
    assert!(index.search_text(&mut tokenizer, "zebra", 5).unwrap().is_empty());
}

#[test]
fn the_same_document_twice_gets_two_ids() {
    let (mut tokenizer, mut index) = index();
    let vec = index.model().unwrap().vectorize_text(&mut tokenizer, "the bird").unwrap();
    let a = index.append(&vec).unwrap();
    let b = index.append(&vec).unwrap();
    assert_eq!((a, b), (3, 4));
    assert_eq!(index.len(), 5);
}

#[test]
fn mixing_text_configurations_is_rejected() {
    let (_, model) = model();
    let mut other = Tokenizer::new(TextConfig::qgrams(&[3]));
    assert!(matches!(
        model.vectorize_text(&mut other, "cat"),
        Err(Error::IncompatibleConfig { .. })
    ));
}

#[test]
fn select_top_keeps_the_heaviest_tokens() {
    let (_, model) = model();
    let top = model.prune_select_top(Selection::Top(2)).unwrap();
    assert_eq!(top.len(), 2);
    // every token seen once weighs ln(2.5); ties go to the lower id
    let tokens: Vec<&str> = top.vocabulary().iter().map(|(_, t, _)| t).collect();
    assert_eq!(tokens, vec!["sat", "dog"]);

    let all = model.prune_select_top(Selection::Ratio(1.0)).unwrap();
    assert_eq!(all.len(), model.len());
    assert!(model.prune_select_top(Selection::Ratio(0.0)).is_err());
}

#[test]
fn shared_index_serves_searches_and_appends() {
    let (mut tokenizer, index) = index();
    let shared = SharedIndex::new(index);
    let vec = shared
        .read(|idx| idx.model().map(|m| m.vectorize_text(&mut tokenizer.clone(), "the cat")))
        .unwrap()
        .unwrap();
    assert_eq!(shared.append(&vec).unwrap(), 3);

    let hits = shared.search_text(&mut tokenizer, "cat", 10).unwrap();
    assert_eq!(hits.len(), 3);
    assert!(!hits.doc_ids().contains(&1));
}

#[test]
fn frozen_index_rejects_appends() {
    let (mut tokenizer, mut index) = index();
    let before = index.search_text(&mut tokenizer, "cat dog", 3).unwrap();
    index.freeze();
    assert!(index.is_frozen());
    assert_eq!(index.search_text(&mut tokenizer, "cat dog", 3).unwrap(), before);
    let vec = index.model().unwrap().vectorize_text(&mut tokenizer, "cat").unwrap();
    assert!(matches!(index.append(&vec), Err(Error::InvalidParameter(_))));
}
