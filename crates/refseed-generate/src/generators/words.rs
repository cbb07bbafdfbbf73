pub(crate) const FIRST_NAMES: &[&str] = &[
    "ada", "alan", "alice", "amara", "anton", "aris", "beatrix", "bruno", "carla", "cedric",
    "clara", "dario", "edith", "elias", "emma", "felix", "freya", "gideon", "greta", "hanna",
    "hugo", "ines", "isaac", "jana", "jonas", "karin", "lars", "lena", "liam", "lotte", "marco",
    "mila", "nadia", "niels", "olga", "oscar", "paula", "pieter", "rosa", "sander", "sofia",
    "tomas", "ursula", "viktor", "wendy", "yara", "zeno",
];

pub(crate) const LAST_NAMES: &[&str] = &[
    "albers", "bakker", "berg", "brandt", "castro", "costa", "dekker", "dijkstra", "engel",
    "fischer", "ferreira", "gomes", "graaf", "hartmann", "hoekstra", "jansen", "keller", "klein",
    "koster", "lange", "lima", "meyer", "molenaar", "novak", "peters", "postma", "ribeiro",
    "schmidt", "silva", "smit", "vermeulen", "visser", "vogel", "wagner", "weber", "willems",
    "wolf", "zimmermann",
];
