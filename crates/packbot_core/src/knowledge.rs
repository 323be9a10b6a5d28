use crate::alias::{AliasIndex, DEFAULT_ALIASES};
use crate::normalize::normalize;

/// Facts about biodegradable and conventional packaging materials.
pub const PACKAGING_FACTS: &[&str] = &[
    "polymer is a large molecule, or macromolecule, made of many smaller, repeating molecular units called monomers",
    "Polylactic Acid (PLA) is a biopolymer used in packaging.",
    "Polyhydroxyalkanoates (PHA) are biodegradable polymers for packaging.",
    "Starch-based polymers are renewable and biodegradable.",
    "Cellulose derivatives like carboxymethyl cellulose and nanocellulose are used in packaging.",
    "Chitosan is a natural polymer with antimicrobial properties.",
    "Gelatin is protein-based and used in edible films.",
    "Alginate is derived from seaweed and used for coatings.",
    "Pectin is a plant-derived polymer used in packaging.",
    "Soy protein isolate and whey protein are used in bio-based films.",
    "Polycaprolactone (PCL) is a biodegradable polyester.",
    "Polybutylene succinate (PBS) is a compostable polymer.",
    "Polyethylene (PE) exists as LDPE and HDPE in conventional packaging.",
    "Polypropylene (PP) is widely used in food containers.",
    "Polyethylene terephthalate (PET) is used in bottles and films.",
    "Polystyrene (PS) is used in foams and rigid packaging.",
    "Polyvinyl chloride (PVC) is used in shrink wraps.",
    "Nylon (Polyamide, PA) provides strong barrier properties.",
    "EVOH (Ethylene vinyl alcohol copolymer) offers high gas barrier.",
    "Metallized films (Aluminum foil laminates) provide UV and gas barrier.",
    "Multilayer composites combine polymers for enhanced performance.",
    "Plasticizers like glycerol, sorbitol, and PEG improve flexibility.",
    "Nanoparticles and fillers are added to improve barrier and strength.",
    "Nanoclay enhances mechanical properties.",
    "TiO2 nanoparticles provide UV protection.",
    "ZnO nanoparticles have antimicrobial effects.",
    "Carbon quantum dots (CQDs) add active properties.",
    "Graphene oxide improves strength and barrier.",
    "Neem oil and lemon oil are natural extracts with antimicrobial effects.",
    "Essential oils like thyme, oregano, cinnamon, clove act as antimicrobials.",
    "Plant polyphenols like tannins and catechins act as antioxidants.",
    "Vitamin E (tocopherol) and Vitamin C (ascorbic acid) are antioxidants.",
    "Cross-linking agents include citric acid, glutaraldehyde, genipin.",
    "Natural dyes, anthocyanins, carotenoids act as colorants and UV blockers.",
    "Biodegradability is the ability of material to decompose by microorganisms.",
    "Compostability means breaking down into CO2, water, and biomass.",
    "Barrier properties include resistance to O2, CO2, moisture, and UV light.",
    "Mechanical properties include tensile strength and elongation.",
    "Thermal stability refers to melting point and glass transition temperature.",
    "Migration is the movement of additives into food.",
    "Antimicrobial activity is inhibition of bacteria and fungi.",
    "Active packaging releases or absorbs substances to extend shelf life.",
    "Intelligent packaging monitors food quality with sensors.",
    "Sustainability includes recyclability and renewable resources.",
];

/// Immutable startup context for the resolver: the corpus, its normalized
/// twin, and the alias index over it. Positions never change once built.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    corpus: Vec<String>,
    normalized: Vec<String>,
    aliases: AliasIndex,
}

impl KnowledgeBase {
    pub fn new(corpus: Vec<String>, aliases: &[(&str, &str)]) -> Self {
        let normalized: Vec<String> = corpus.iter().map(|c| normalize(c)).collect();
        let aliases = AliasIndex::build(aliases, &normalized);
        Self {
            corpus,
            normalized,
            aliases,
        }
    }

    pub fn packaging() -> Self {
        Self::new(
            PACKAGING_FACTS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_ALIASES,
        )
    }

    pub fn corpus(&self) -> &[String] {
        &self.corpus
    }

    pub fn normalized(&self) -> &[String] {
        &self.normalized
    }

    pub fn aliases(&self) -> &AliasIndex {
        &self.aliases
    }

    pub fn entry(&self, index: usize) -> Option<&str> {
        self.corpus.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }
}
