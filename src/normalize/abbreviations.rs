//! Curated abbreviation and first-name lists for Austrian street names.
//!
//! Names are compared after general normalization, so case, spaces and
//! dashes in these lists do not matter.

/// (full form, abbreviated or alternative form)
pub const ABBREVIATIONS: &[(&str, &str)] = &[
    ("Doktor", "Dr."),
    ("Professor", "Prof."),
    ("Pfarrer", "Pf."),
    ("Pater", "P."),
    ("Wiener", "Wr."),
    ("Sankt", "St."),
    ("von", "v."),
    ("van", "v."),
    ("Abt", "A."),
    ("Architekt", "Arch."),
    ("Bürgermeister", "Bgm."),
    ("Bgmst.", "Bgm."),
    ("Nationalrat", "NR."),
    ("Dechant", "D."),
    ("Ingenieur", "Ing."),
    ("Schwester", "Sr."),
    ("Zur", "Z."),
    ("Weissenbach bei Mödling", "Weissenbach"),
    ("Kais.Elisabeth", "Kaiserin Elisabeth"),
    ("Beethoven", "Ludwig van Beethoven"),
    ("Schedyfka", "Wilhelm Schedyfka"),
    ("Rückert", "Friedrich Rückert"),
    ("Rosegger", "Peter Rosegger"),
    ("Nestroy", "Johann Nestroy"),
    ("Billroth", "Theodor Billroth"),
];

/// First names (and their common abbreviations) reduced to an initial.
pub const FIRST_NAMES: &[&str] = &[
    "Ad.", "Adam", "Adalbert", "Adolf", "Alexander", "Alfons", "Alfred", "Alois", "Alphons",
    "Amadeus", "Amand", "Ambros", "Ant.", "Anselm", "Anton", "Arthur", "Aug.", "August",
    "Balthasar", "Bernhard", "Bertha",
    "Christoph", "Clemens", "Conrad",
    "Egon", "Engelbert",
    "Felix", "Ferd.", "Ferdinand", "Franz", "Fr.", "Friedr.", "Friedrich",
    "Georg", "Gottfr.", "Gottfried", "Gottlieb", "Gustav",
    "Hans", "Heinr.", "Heinrich", "Herbert", "Hertha", "Herta", "Hironimus", "Hugo",
    "Isolde",
    "Jakob", "Joh.", "Johann", "Josef", "Joseph", "Julius",
    "Karl",
    "Leop.", "Leopold", "Ludwig",
    "Maria", "Mathias", "Max", "Michael", "Moritz", "Mich.", "Michel",
    "Nikolaus",
    "Oskar", "Ottokar", "Otto",
    "Richard", "Robert", "Rudolf",
    "Sebastian",
    "Theodor",
    "Viktor",
    "Walter", "Wenzel", "Wilhelm", "Wolfgang",
    "Xaver",
    "Zach.", "Zacharias",
];
